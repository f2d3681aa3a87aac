use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};

const KUBE_DIR: &str = ".kube";
const KUBECONFIG_FILE: &str = "config";

/// How the `data` field of the cluster config response is encoded. Older API
/// revisions send the kubeconfig base64-encoded, newer ones send it as is.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Auto,
    Base64,
    Plain,
}

pub fn decode(data: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Plain => Ok(data.as_bytes().to_vec()),
        Encoding::Base64 => Ok(STANDARD.decode(data.trim())?),
        Encoding::Auto => Ok(STANDARD
            .decode(data.trim())
            .unwrap_or_else(|_| data.as_bytes().to_vec())),
    }
}

/// Writes the kubeconfig to `<workspace>/.kube/config` and returns its path.
pub fn write_kubeconfig(workspace: &Path, data: &str, encoding: Encoding) -> Result<PathBuf> {
    let contents = decode(data, encoding)?;
    let dir = workspace.join(KUBE_DIR);
    create_dir(&dir)?;
    let path = dir.join(KUBECONFIG_FILE);
    fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(unix)]
fn create_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

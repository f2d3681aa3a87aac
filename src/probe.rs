use crate::client::ApiResponse;
use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// The remote API answered 404: the resource does not exist at all.
    Absent,
    /// The resource exists but is not usable yet.
    Pending,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }

    pub fn exists(self) -> bool {
        self != Readiness::Absent
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => write!(f, "ready"),
            Readiness::Absent => write!(f, "absent"),
            Readiness::Pending => write!(f, "pending"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Some endpoints answer 400 while the resource is still materializing.
    pub bad_request_is_pending: bool,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        ProbePolicy {
            bad_request_is_pending: true,
        }
    }
}

impl ProbePolicy {
    pub fn strict() -> Self {
        ProbePolicy {
            bad_request_is_pending: false,
        }
    }
}

pub fn classify(probe: &str, response: &ApiResponse, policy: ProbePolicy) -> Result<Readiness> {
    match response.status {
        200 => Ok(Readiness::Ready),
        404 => Ok(Readiness::Absent),
        204 | 503 => Ok(Readiness::Pending),
        400 if policy.bad_request_is_pending => Ok(Readiness::Pending),
        status => Err(Error::unexpected(probe, status, response.body.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> ApiResponse {
        ApiResponse {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn classify_maps_recognized_statuses() {
        let policy = ProbePolicy::default();
        let cases = [
            (200, Readiness::Ready),
            (404, Readiness::Absent),
            (204, Readiness::Pending),
            (503, Readiness::Pending),
            (400, Readiness::Pending),
        ];
        for (status, expected) in cases {
            assert_eq!(
                classify("cluster probe", &response(status), policy).unwrap(),
                expected,
                "status {}",
                status
            );
        }
    }

    #[test]
    fn classify_rejects_every_other_status() {
        for status in [201, 202, 301, 401, 403, 409, 500, 502] {
            let result = classify("cluster probe", &response(status), ProbePolicy::default());
            match result {
                Err(Error::UnexpectedStatus { status: got, .. }) => assert_eq!(got, status),
                other => panic!("status {} gave {:?}", status, other),
            }
        }
    }

    #[test]
    fn strict_policy_treats_bad_request_as_fatal() {
        let result = classify("helm probe", &response(400), ProbePolicy::strict());
        assert!(matches!(
            result,
            Err(Error::UnexpectedStatus { status: 400, .. })
        ));
    }

    #[test]
    fn absent_and_pending_are_both_not_ready() {
        assert!(!Readiness::Absent.is_ready());
        assert!(!Readiness::Pending.is_ready());
        assert!(Readiness::Pending.exists());
        assert!(!Readiness::Absent.exists());
    }
}

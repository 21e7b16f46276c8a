//! Wire status codes: `SUCCESS = 0`, `FAIL = -1`, `PERMISSION_DENIED = 1`.

use serde::{Deserialize, Serialize};

#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Success = 0,
    Fail = -1,
    PermissionDenied = 1,
}

impl StatusCode {
    pub fn from_result<T>(result: &Result<T, crate::error::SmosError>) -> Self {
        match result {
            Ok(_) => StatusCode::Success,
            Err(err) => err.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_match_source_system() {
        assert_eq!(StatusCode::Success as i8, 0);
        assert_eq!(StatusCode::Fail as i8, -1);
        assert_eq!(StatusCode::PermissionDenied as i8, 1);
    }
}

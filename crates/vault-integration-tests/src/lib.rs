//! Integration-test host crate. All coverage lives in `tests/`.

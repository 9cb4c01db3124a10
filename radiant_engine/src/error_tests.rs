/// Tests for Error
///
/// Validates Display formatting and that the error macros construct
/// the expected variants.

use super::*;

fn takes_error(e: &dyn std::error::Error) -> String {
    e.to_string()
}

#[test]
fn test_display_allocation() {
    let e = Error::Allocation("bindless slots exhausted".to_string());
    assert_eq!(e.to_string(), "Allocation failed: bindless slots exhausted");
}

#[test]
fn test_display_build() {
    let e = Error::Build("empty instance list".to_string());
    assert_eq!(e.to_string(), "Build failed: empty instance list");
}

#[test]
fn test_display_swapchain_lost() {
    assert_eq!(Error::SwapchainLost.to_string(), "Swapchain lost");
}

#[test]
fn test_display_precondition() {
    let e = Error::Precondition("TLAS not built".to_string());
    assert_eq!(e.to_string(), "Precondition violated: TLAS not built");
}

#[test]
fn test_implements_std_error() {
    let e = Error::Backend("device lost".to_string());
    assert_eq!(takes_error(&e), "Backend error: device lost");
}

#[test]
fn test_engine_err_macro_formats() {
    let e = crate::engine_err!("radiant::test", "code {}", 42);
    match e {
        Error::Backend(msg) => assert_eq!(msg, "code 42"),
        other => panic!("unexpected variant: {:?}", other),
    }
}

#[test]
fn test_engine_bail_macro_returns() {
    fn failing() -> Result<()> {
        crate::engine_bail!("radiant::test", "bailed with {}", "reason");
    }
    let err = failing().unwrap_err();
    match err {
        Error::Backend(msg) => assert_eq!(msg, "bailed with reason"),
        other => panic!("unexpected variant: {:?}", other),
    }
}

#[test]
fn test_result_alias() {
    fn ok_fn() -> Result<u32> {
        Ok(7)
    }
    assert_eq!(ok_fn().unwrap(), 7);
}

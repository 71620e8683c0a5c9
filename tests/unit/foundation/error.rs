use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RaytileError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        RaytileError::partition("x")
            .to_string()
            .contains("partition invariant violated:")
    );
    assert!(
        RaytileError::scheduler("x")
            .to_string()
            .contains("scheduler error:")
    );
    assert!(
        RaytileError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn tile_render_keeps_tile_and_source() {
    let err = RaytileError::tile_render(5, RaytileError::validation("bad sample"));
    assert_eq!(err.failed_tile(), Some(5));
    assert!(err.to_string().contains("tile 5 failed"));
    assert!(err.to_string().contains("bad sample"));
    let source = std::error::Error::source(&err).expect("source");
    assert!(source.to_string().contains("validation error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RaytileError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.failed_tile(), None);
}

use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PianoError::config("x")
            .to_string()
            .contains("config error:")
    );
    assert!(
        PianoError::midi_format("x")
            .to_string()
            .contains("midi format error:")
    );
    assert!(
        PianoError::render("x")
            .to_string()
            .contains("render error:")
    );
}

#[test]
fn external_tool_surfaces_output_verbatim() {
    let err = PianoError::ExternalTool {
        tool: "ffmpeg".to_string(),
        description: "concat frames".to_string(),
        status: "exit status: 1".to_string(),
        output: "frames.txt: Invalid data found\n".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.starts_with("ffmpeg failed (exit status: 1)"));
    assert!(msg.contains("concat frames"));
    assert!(msg.contains("frames.txt: Invalid data found"));
}

#[test]
fn tool_missing_names_the_program() {
    let err = PianoError::tool_missing(
        "fluidsynth",
        std::ffi::OsStr::new("/opt/fs/bin/fluidsynth"),
        "synthesize audio",
    );
    let msg = err.to_string();
    assert!(msg.starts_with("fluidsynth is required to synthesize audio"), "{msg}");
    assert!(msg.contains("'/opt/fs/bin/fluidsynth'"), "{msg}");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PianoError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

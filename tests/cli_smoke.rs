use std::path::PathBuf;
use std::process::Command;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_loopline")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "loopline.exe"
            } else {
                "loopline"
            });
            p
        })
}

#[test]
fn cli_config_prints_default_json() {
    let out = Command::new(exe()).arg("config").output().unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["text"], "INFINITE LOOP ");
    assert_eq!(json["bgColor"], "#000000");
    assert_eq!(json["direction"], "left");
}

#[test]
fn cli_frame_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("nested").join("out.png");

    let status = Command::new(exe())
        .args([
            "frame", "--width", "160", "--height", "90", "--ticks", "3", "--text", "HI",
            "--speed", "4", "--out",
        ])
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (160, 90));
}

#[test]
fn cli_frame_honours_config_file_and_scale() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("loop.json");
    std::fs::write(&cfg_path, r##"{ "text": "", "bgColor": "#336699" }"##).unwrap();
    let out_path = dir.path().join("out.png");

    let status = Command::new(exe())
        .args(["frame", "--width", "40", "--height", "20", "--scale", "2", "--config"])
        .arg(&cfg_path)
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (80, 40));
    assert_eq!(img.get_pixel(10, 10).0, [0x33, 0x66, 0x99, 255]);
}

#[test]
fn cli_rejects_unknown_mood() {
    let status = Command::new(exe())
        .args(["suggest", "--topic", "rain", "--mood", "sleepy"])
        .status()
        .unwrap();
    assert!(!status.success());
}

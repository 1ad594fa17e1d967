use std::cell::Cell;
use std::fs;
use std::future::Future;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use pake_configure::{
    resolve_platform, BuildContext, IconError, IconFetcher, Pipeline, PipelineError, Platform,
    Tier,
};
use serde_json::{json, Value};

struct FakeFetcher {
    bytes: Option<Vec<u8>>,
    calls: Cell<usize>,
}

impl FakeFetcher {
    fn offline() -> Self {
        Self {
            bytes: None,
            calls: Cell::new(0),
        }
    }

    fn serving(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            calls: Cell::new(0),
        }
    }
}

impl IconFetcher for &FakeFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, IconError>> {
        self.calls.set(self.calls.get() + 1);
        let result = self
            .bytes
            .clone()
            .ok_or_else(|| IconError::Fetch(url.to_string()));
        async move { result }
    }
}

fn ctx(name: &str, icon: Option<&str>) -> BuildContext {
    let name = name.to_string();
    let icon = icon.map(String::from);
    BuildContext::from_lookup(move |k| match k {
        "URL" => Some("https://example.com".into()),
        "NAME" => Some(name.clone()),
        "TITLE" => Some("Example".into()),
        "NAME_ZH" => Some("示例".into()),
        "ICON" => icon.clone(),
        _ => None,
    })
    .unwrap()
}

fn png(size: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(size, size, Rgba([1, 2, 3, 255])))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn write(dir: &Path, rel: &str, bytes: &[u8]) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn scaffold(dir: &Path) {
    let templates = [
        (
            "pake.json",
            json!({"windows": [{"url": "", "width": 1200, "height": 780}]}),
        ),
        ("tauri.conf.json", json!({"productName": "", "version": "1.0.0"})),
        ("tauri.linux.conf.json", json!({"bundle": {"linux": {"deb": {}}}})),
        ("tauri.windows.conf.json", json!({"bundle": {"resources": []}})),
        ("tauri.macos.conf.json", json!({"bundle": {}})),
    ];
    for (name, value) in templates {
        write(dir, name, value.to_string().as_bytes());
    }
    write(dir, "png/icon_512.png", &png(512));
    write(dir, "png/icon_256.png", &png(256));
}

fn read_json(dir: &Path, name: &str) -> Value {
    serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
}

#[tokio::test]
async fn no_icon_source_falls_back_to_default_and_sets_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    let fetcher = FakeFetcher::offline();

    let report = Pipeline::new(dir.path(), Platform::Linux, &fetcher)
        .run(&ctx("Foo", None))
        .await
        .unwrap();

    assert_eq!(report.icons[0].outcome.as_ref().unwrap().tier, Tier::BundledDefault);
    assert_eq!(
        fs::read(dir.path().join("png/Foo_512.png")).unwrap(),
        fs::read(dir.path().join("png/icon_512.png")).unwrap()
    );
    assert_eq!(fetcher.calls.get(), 0);

    for name in ["pake.json", "tauri.conf.json", "tauri.linux.conf.json"] {
        let v = read_json(dir.path(), name);
        assert_eq!(v["identifier"], "com.pake.Foo", "{name}");
        assert_eq!(v["productName"], "com-pake-Foo", "{name}");
    }
    let text = fs::read_to_string(dir.path().join("pake.json")).unwrap();
    assert!(text.starts_with("{\n  \"windows\""));
    assert!(text.ends_with("}\n"));
}

#[tokio::test]
async fn second_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    let fetcher = FakeFetcher::serving(png(64));
    let ctx = ctx("foo", Some("https://example.com/logo.png"));
    let pipeline = Pipeline::new(dir.path(), Platform::Windows, &fetcher);

    let first = pipeline.run(&ctx).await.unwrap();
    assert!(first.created() > 0);
    let snapshot: Vec<Vec<u8>> = ["pake.json", "tauri.conf.json", "tauri.windows.conf.json"]
        .iter()
        .map(|n| fs::read(dir.path().join(n)).unwrap())
        .collect();

    let second = pipeline.run(&ctx).await.unwrap();
    assert_eq!(second.created(), 0);
    assert_eq!(fetcher.calls.get(), 1);
    for (name, before) in ["pake.json", "tauri.conf.json", "tauri.windows.conf.json"]
        .iter()
        .zip(snapshot)
    {
        assert_eq!(fs::read(dir.path().join(name)).unwrap(), before, "{name}");
    }
    assert_eq!(
        read_json(dir.path(), "tauri.windows.conf.json")["bundle"]["resources"],
        json!(["png/foo.ico"])
    );
}

#[tokio::test]
async fn remote_jpeg_is_padded_to_exact_square() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    let mut jpeg = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image::RgbImage::from_pixel(300, 150, image::Rgb([5, 5, 5])))
        .write_to(&mut jpeg, ImageFormat::Jpeg)
        .unwrap();
    let fetcher = FakeFetcher::serving(jpeg.into_inner());

    let report = Pipeline::new(dir.path(), Platform::Linux, &fetcher)
        .run(&ctx("foo", Some("https://example.com/logo.jpg")))
        .await
        .unwrap();
    assert_eq!(report.icons[0].outcome.as_ref().unwrap().tier, Tier::Remote);

    let img = image::open(dir.path().join("png/foo_512.png")).unwrap();
    assert_eq!(img.dimensions(), (512, 512));
    assert_eq!(img.color(), image::ColorType::Rgba8);
    assert_eq!(img.get_pixel(0, 0)[3], 0);
    assert_eq!(img.get_pixel(256, 256)[3], 255);
}

#[tokio::test]
async fn macos_generates_icns_and_intermediate_sizes() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    let fetcher = FakeFetcher::serving(png(300));

    let report = Pipeline::new(dir.path(), Platform::Macos, &fetcher)
        .run(&ctx("foo", Some("https://example.com/logo.png")))
        .await
        .unwrap();
    assert_eq!(report.icons[0].path, "icons/foo.icns");
    assert_eq!(report.icons[0].outcome.as_ref().unwrap().tier, Tier::Remote);
    assert!(report.missing().is_empty());

    let file = fs::File::open(dir.path().join("icons/foo.icns")).unwrap();
    let family = icns::IconFamily::read(file).unwrap();
    assert!(family
        .available_icons()
        .contains(&icns::IconType::RGBA32_512x512));

    for (rel, size) in [("png/foo_32.png", 32), ("png/foo_128.png", 128), ("png/foo_256.png", 256)] {
        let img = image::open(dir.path().join(rel)).unwrap();
        assert_eq!(img.dimensions(), (size, size), "{rel}");
    }

    let v = read_json(dir.path(), "tauri.macos.conf.json");
    assert_eq!(
        v["bundle"]["icon"],
        json!([
            "icons/foo.icns",
            "png/foo_32.png",
            "png/foo_128.png",
            "png/foo_256.png"
        ])
    );
    assert_eq!(v["identifier"], "com.pake.foo");
}

#[tokio::test]
async fn missing_icons_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    fs::remove_file(dir.path().join("png/icon_512.png")).unwrap();
    let fetcher = FakeFetcher::offline();

    let report = Pipeline::new(dir.path(), Platform::Linux, &fetcher)
        .run(&ctx("foo", None))
        .await
        .unwrap();
    assert_eq!(report.missing(), vec!["png/foo_512.png"]);
    assert_eq!(
        read_json(dir.path(), "tauri.linux.conf.json")["bundle"]["icon"],
        json!(["png/foo_512.png"])
    );
}

#[tokio::test]
async fn missing_template_aborts_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    fs::remove_file(dir.path().join("tauri.macos.conf.json")).unwrap();
    let before = fs::read(dir.path().join("pake.json")).unwrap();
    let fetcher = FakeFetcher::offline();

    let err = Pipeline::new(dir.path(), Platform::Macos, &fetcher)
        .run(&ctx("foo", None))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert_eq!(fs::read(dir.path().join("pake.json")).unwrap(), before);
}

#[test]
fn unknown_platform_is_rejected() {
    assert!(resolve_platform(Some("haiku")).is_err());
    assert_eq!(resolve_platform(Some("macos")).unwrap(), Platform::Macos);
}

#[test]
fn missing_required_parameter_is_fatal() {
    let err = BuildContext::from_lookup(|k| (k != "NAME_ZH").then(|| "x".to_string()));
    assert!(err.is_err());
}

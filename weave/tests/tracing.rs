use std::{
    io::Write,
    sync::{Arc, Mutex},
};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use weave::{Container, plugins::{LoggingPlugin, install}};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn it_logs_pipeline_events() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let container = Container::new();
        install(&container, Arc::new(LoggingPlugin::new(Level::INFO))).unwrap();

        container.register_transient("Answer", || 42).unwrap();
        container.resolve("Answer").unwrap();
        _ = container.resolve("Ghost");
    });

    let logs = capture.text();
    assert!(logs.contains("service registered"));
    assert!(logs.contains("service resolved"));
    assert!(logs.contains("resolution failed"));
    assert!(logs.contains("Ghost"));
}

#[test]
fn it_respects_configured_level() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let container = Container::new();
        install(&container, Arc::new(LoggingPlugin::default())).unwrap();

        container.register_transient("Quiet", || ()).unwrap();
        container.resolve("Quiet").unwrap();
    });

    assert!(!capture.text().contains("service resolved"));
}

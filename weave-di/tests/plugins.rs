use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use parking_lot::Mutex;
use weave_di::{
    Container,
    error::{Error, PluginError},
    plugin::{
        Capabilities, MonitoringPlugin, Phase, PluginDescriptor, PluginEvent, PluginHooks,
        PluginState, RegistrationEvent, RegistrationPlugin, ResolutionEvent, ResolutionPlugin,
        ValidationPlugin,
    },
};

struct RejectAll;

impl ValidationPlugin for RejectAll {
    fn validate_registration(&self, _: &RegistrationEvent<'_>) -> Result<bool, PluginError> {
        Ok(false)
    }
}

struct DenyResolution(&'static str);

impl ResolutionPlugin for DenyResolution {
    fn before_resolution(&self, event: &ResolutionEvent<'_>) -> Result<(), PluginError> {
        if event.key == self.0 {
            Err(PluginError::rejected("denied"))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct ResolutionGate {
    failures: Mutex<Vec<String>>,
}

impl ValidationPlugin for ResolutionGate {
    fn validate_resolution(&self, event: &ResolutionEvent<'_>) -> Result<bool, PluginError> {
        match event.key.as_str() {
            "Locked" => Ok(false),
            "Broken" => Err(PluginError::failed("policy store unavailable")),
            _ => Ok(true),
        }
    }
}

impl ResolutionPlugin for ResolutionGate {
    fn on_resolution_failure(&self, event: &ResolutionEvent<'_>, error: &Error) -> Result<(), PluginError> {
        assert!(error.is_rejected());
        self.failures.lock().push(event.key.to_string());
        Ok(())
    }
}

struct Recorder {
    name: &'static str,
    journal: Arc<Mutex<Vec<String>>>,
}

impl RegistrationPlugin for Recorder {
    fn after_registration(&self, event: &RegistrationEvent<'_>) -> Result<(), PluginError> {
        self.journal.lock().push(format!("{}:{}", self.name, event.key));
        Ok(())
    }
}

struct FailingObserver;

impl RegistrationPlugin for FailingObserver {
    fn after_registration(&self, _: &RegistrationEvent<'_>) -> Result<(), PluginError> {
        Err(PluginError::failed("observer is broken"))
    }
}

#[derive(Default)]
struct Phases(Mutex<Vec<Phase>>);

impl MonitoringPlugin for Phases {
    fn observe(&self, event: &PluginEvent<'_>) -> Result<(), PluginError> {
        self.0.lock().push(event.phase());
        Ok(())
    }
}

fn recorder(container: &Container, name: &'static str, priority: i32, journal: &Arc<Mutex<Vec<String>>>) {
    container.register_plugin(
        PluginDescriptor::new(name)
            .with_priority(priority)
            .with_capabilities(Capabilities::REGISTRATION),
        PluginHooks::new().with_registration(Arc::new(Recorder { name, journal: journal.clone() })),
    ).unwrap();
    container.activate_plugin(name).unwrap();
}

#[test]
fn it_vetoes_every_registration() {
    let container = Container::new();
    container.register_plugin(
        PluginDescriptor::new("reject-all").with_capabilities(Capabilities::VALIDATION),
        PluginHooks::new().with_validation(Arc::new(RejectAll)),
    ).unwrap();
    container.activate_plugin("reject-all").unwrap();

    for key in ["A", "B", "C"] {
        let err = container.register_transient(key, || ()).unwrap_err();

        match err {
            Error::RejectedByPlugin { plugin, phase, .. } => {
                assert_eq!(&*plugin, "reject-all");
                assert_eq!(phase, Phase::ValidateRegistration);
            }
            _ => panic!("expected a rejection"),
        }
        assert!(!container.is_registered(key));
    }
}

#[test]
fn it_aborts_resolution_from_before_hook() {
    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    container.register_transient("Secret", move || counter.fetch_add(1, Ordering::SeqCst)).unwrap();
    container.register_transient("Public", || ()).unwrap();
    container.register_plugin(
        PluginDescriptor::new("deny").with_capabilities(Capabilities::RESOLUTION),
        PluginHooks::new().with_resolution(Arc::new(DenyResolution("Secret"))),
    ).unwrap();
    container.activate_plugin("deny").unwrap();

    let err = container.resolve("Secret").unwrap_err();

    assert!(matches!(err, Error::RejectedByPlugin { phase: Phase::BeforeResolution, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(container.resolve("Public").is_ok());
}

#[test]
fn it_rejects_resolution_from_validator() {
    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    for key in ["Locked", "Broken", "Open"] {
        let counter = calls.clone();
        container.register_singleton(key, move || counter.fetch_add(1, Ordering::SeqCst)).unwrap();
    }
    let gate = Arc::new(ResolutionGate::default());
    container.register_plugin(
        PluginDescriptor::new("gate").with_capabilities(Capabilities::VALIDATION | Capabilities::RESOLUTION),
        PluginHooks::new()
            .with_validation(gate.clone())
            .with_resolution(gate.clone()),
    ).unwrap();
    container.activate_plugin("gate").unwrap();

    for key in ["Locked", "Broken"] {
        let err = container.resolve(key).unwrap_err();

        match err {
            Error::RejectedByPlugin { plugin, phase, source } => {
                assert_eq!(&*plugin, "gate");
                assert_eq!(phase, Phase::ValidateResolution);
                if key == "Locked" {
                    assert!(matches!(source, PluginError::Rejected(_)));
                } else {
                    assert!(matches!(source, PluginError::Failed(_)));
                }
            }
            _ => panic!("expected a rejection"),
        }
        assert!(!container.registration(key).unwrap().is_instantiated());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*gate.failures.lock(), ["Locked", "Broken"]);
    assert!(container.resolve("Open").is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn it_dispatches_in_priority_order() {
    let container = Container::new();
    let journal = Arc::new(Mutex::new(Vec::new()));
    recorder(&container, "late", 10, &journal);
    recorder(&container, "first", -5, &journal);
    recorder(&container, "tie-1", 0, &journal);
    recorder(&container, "tie-2", 0, &journal);

    container.register_transient("Key", || ()).unwrap();

    assert_eq!(*journal.lock(), ["first:Key", "tie-1:Key", "tie-2:Key", "late:Key"]);
}

#[test]
fn it_skips_inactive_plugins() {
    let container = Container::new();
    let journal = Arc::new(Mutex::new(Vec::new()));
    recorder(&container, "recorder", 0, &journal);

    container.deactivate_plugin("recorder").unwrap();
    container.register_transient("Quiet", || ()).unwrap();
    container.activate_plugin("recorder").unwrap();
    container.register_transient("Loud", || ()).unwrap();

    assert_eq!(*journal.lock(), ["recorder:Loud"]);
}

#[test]
fn it_does_not_block_on_observer_failures() {
    let container = Container::new();
    let journal = Arc::new(Mutex::new(Vec::new()));
    container.register_plugin(
        PluginDescriptor::new("broken").with_priority(-1).with_capabilities(Capabilities::REGISTRATION),
        PluginHooks::new().with_registration(Arc::new(FailingObserver)),
    ).unwrap();
    container.activate_plugin("broken").unwrap();
    recorder(&container, "recorder", 0, &journal);

    container.register_transient("Key", || ()).unwrap();

    assert!(container.is_registered("Key"));
    assert_eq!(*journal.lock(), ["recorder:Key"]);
}

#[test]
fn it_stops_observers_when_configured() {
    let container = Container::builder()
        .with_config(|cfg| cfg.with_stop_on_observer_error(true))
        .with_plugin(
            PluginDescriptor::new("broken").with_priority(-1).with_capabilities(Capabilities::REGISTRATION),
            PluginHooks::new().with_registration(Arc::new(FailingObserver)),
        )
        .build()
        .unwrap();
    let journal = Arc::new(Mutex::new(Vec::new()));
    recorder(&container, "recorder", 0, &journal);

    container.register_transient("Key", || ()).unwrap();

    assert!(container.is_registered("Key"));
    assert!(journal.lock().is_empty());
}

#[test]
fn it_monitors_every_phase() {
    let phases = Arc::new(Phases::default());
    let container = Container::builder()
        .with_plugin(
            PluginDescriptor::new("monitor").with_capabilities(Capabilities::MONITORING),
            PluginHooks::new().with_monitoring(phases.clone()),
        )
        .build()
        .unwrap();

    container.register_transient("Key", || ()).unwrap();
    container.resolve("Key").unwrap();
    _ = container.resolve("Ghost");
    container.reset();

    assert_eq!(*phases.0.lock(), [
        Phase::OnInitialized,
        Phase::ValidateRegistration,
        Phase::BeforeRegistration,
        Phase::AfterRegistration,
        Phase::ValidateResolution,
        Phase::BeforeResolution,
        Phase::AfterResolution,
        Phase::OnResolutionFailure,
        Phase::BeforeReset,
        Phase::AfterReset,
    ]);
}

#[test]
fn it_walks_plugin_state_machine() {
    let container = Container::new();
    container.register_plugin(PluginDescriptor::new("p"), PluginHooks::new()).unwrap();

    assert_eq!(container.plugin_state("p"), Some(PluginState::Registered));
    assert!(matches!(
        container.deactivate_plugin("p"),
        Err(PluginError::InvalidTransition { from: PluginState::Registered, to: PluginState::Inactive, .. })
    ));

    container.set_plugin_active("p", true).unwrap();
    container.set_plugin_active("p", false).unwrap();
    container.set_plugin_active("p", true).unwrap();
    assert_eq!(container.plugin_state("p"), Some(PluginState::Active));

    container.remove_plugin("p").unwrap();
    assert_eq!(container.plugin_state("p"), None);
    assert!(matches!(container.activate_plugin("p"), Err(PluginError::NotFound(_))));
}

#[test]
fn it_rejects_descriptor_without_matching_hook() {
    let container = Container::new();

    let err = container.register_plugin(
        PluginDescriptor::new("hollow").with_capabilities(Capabilities::VALIDATION),
        PluginHooks::new(),
    ).unwrap_err();

    assert!(matches!(err, PluginError::MissingHook { .. }));
    assert!(container.plugins().is_empty());
}

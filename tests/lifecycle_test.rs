use anyhow::Result;
use async_trait::async_trait;
use service_registry::utils::logger::try_init_test_logger;
use service_registry::{
    InterfaceId, LifecycleNotifier, PlatformGate, PriorityLifecycle, RegistrationSequencer, RegistryError,
    Service, ServiceCatalog, ServiceDescriptor, ServiceFactory, ServiceRegistry,
};
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: String,
    journal: Journal,
    fail_start: bool,
}

#[async_trait]
impl Service for Recorder {
    async fn start(&self) -> service_registry::Result<()> {
        if self.fail_start {
            return Err(RegistryError::ConstructionFailed {
                service: self.name.clone(),
                details: "device unavailable".to_string(),
            });
        }
        self.journal.lock().unwrap().push(format!("start:{}", self.name));
        Ok(())
    }

    async fn stop(&self) -> service_registry::Result<()> {
        self.journal.lock().unwrap().push(format!("stop:{}", self.name));
        Ok(())
    }
}

fn recorder_catalog(journal: &Journal) -> Result<ServiceCatalog> {
    try_init_test_logger();
    let mut catalog = ServiceCatalog::new();

    let healthy = Arc::clone(journal);
    catalog.register_factory(ServiceFactory::new("Recorder", move |args, _| {
        Ok(Arc::new(Recorder {
            name: args.name.clone(),
            journal: Arc::clone(&healthy),
            fail_start: false,
        }) as Arc<dyn Service>)
    }))?;

    let broken = Arc::clone(journal);
    catalog.register_factory(ServiceFactory::new("BrokenRecorder", move |args, _| {
        Ok(Arc::new(Recorder {
            name: args.name.clone(),
            journal: Arc::clone(&broken),
            fail_start: true,
        }) as Arc<dyn Service>)
    }))?;

    Ok(catalog)
}

fn recorder(name: &str, priority: u32) -> ServiceDescriptor {
    ServiceDescriptor::new(name, format!("I{}", name), "Recorder").with_priority(priority)
}

#[tokio::test]
async fn test_start_follows_priority_and_stop_reverses() -> Result<()> {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::shared();
    let sequencer = RegistrationSequencer::new(
        Arc::clone(&registry),
        recorder_catalog(&journal)?,
        PlatformGate::new("linux"),
    );

    // 註冊依列表順序，啟動依 priority
    let report = sequencer.run(&[
        recorder("Network", 20),
        recorder("Config", 0),
        recorder("Audio", 20),
        recorder("Input", 10),
    ])?;
    assert_eq!(report.registered_count(), 4);

    let lifecycle = PriorityLifecycle::new();
    let started = lifecycle.start_all(&registry, &report).await?;
    assert!(started.iter().all(|r| r.result.is_ok()));
    assert_eq!(
        lifecycle.started().await,
        vec!["Config", "Input", "Network", "Audio"]
    );

    lifecycle.stop_all().await?;
    assert!(lifecycle.started().await.is_empty());

    let events = journal.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start:Config",
            "start:Input",
            "start:Network",
            "start:Audio",
            "stop:Audio",
            "stop:Network",
            "stop:Input",
            "stop:Config",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_start_does_not_block_others() -> Result<()> {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::shared();
    let sequencer = RegistrationSequencer::new(
        Arc::clone(&registry),
        recorder_catalog(&journal)?,
        PlatformGate::new("linux"),
    );

    let report = sequencer.run(&[
        recorder("Config", 0),
        ServiceDescriptor::new("Camera", "ICamera", "BrokenRecorder").with_priority(5),
        recorder("Audio", 10),
    ])?;

    let lifecycle = PriorityLifecycle::new();
    let results = lifecycle.start_all(&registry, &report).await?;

    let camera = results.iter().find(|r| r.name == "Camera").unwrap();
    assert!(matches!(
        camera.result,
        Err(RegistryError::LifecycleFailed { .. })
    ));
    assert_eq!(lifecycle.started().await, vec!["Config", "Audio"]);

    // 只停止成功啟動的服務
    let stopped = lifecycle.stop_all().await?;
    let names: Vec<&str> = stopped.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Audio", "Config"]);
    Ok(())
}

#[tokio::test]
async fn test_unregistered_service_is_not_started() -> Result<()> {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::shared();
    let sequencer = RegistrationSequencer::new(
        Arc::clone(&registry),
        recorder_catalog(&journal)?,
        PlatformGate::new("linux"),
    );

    let report = sequencer.run(&[recorder("Config", 0), recorder("Audio", 1)])?;
    registry.unregister(&"IAudio".into())?;

    let lifecycle = PriorityLifecycle::new();
    let results = lifecycle.start_all(&registry, &report).await?;

    assert_eq!(results.len(), 1);
    assert_eq!(lifecycle.started().await, vec!["Config"]);
    Ok(())
}

#[tokio::test]
async fn test_replaced_instance_is_not_started_under_old_name() -> Result<()> {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = ServiceRegistry::shared();
    let sequencer = RegistrationSequencer::new(
        Arc::clone(&registry),
        recorder_catalog(&journal)?,
        PlatformGate::new("linux"),
    );

    let report = sequencer.run(&[recorder("Config", 0), recorder("Audio", 1)])?;

    // 同一介面改由另一個實例佔用
    registry.unregister(&"IAudio".into())?;
    registry.register(
        InterfaceId::new("IAudio"),
        Arc::new(Recorder {
            name: "Replacement".to_string(),
            journal: Arc::clone(&journal),
            fail_start: false,
        }),
        "Replacement",
    )?;

    let lifecycle = PriorityLifecycle::new();
    let results = lifecycle.start_all(&registry, &report).await?;

    assert_eq!(results.len(), 1);
    assert_eq!(lifecycle.started().await, vec!["Config"]);
    assert!(!journal
        .lock()
        .unwrap()
        .iter()
        .any(|event| event == "start:Replacement"));
    Ok(())
}

#[test]
fn test_default_hooks_are_noops() {
    struct Plain;

    impl Service for Plain {}

    let plain = Plain;
    assert!(tokio_test::block_on(plain.start()).is_ok());
    assert!(tokio_test::block_on(plain.stop()).is_ok());
}

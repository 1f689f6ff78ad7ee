use clap::Parser;
use service_registry::core::plan::PlannedAction;
use service_registry::utils::error::ErrorSeverity;
use service_registry::utils::logger;
use service_registry::utils::monitor::SystemMonitor;
use service_registry::utils::validation::Validate;
use service_registry::{CliConfig, RegistrationPlan, RegistryConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting service-registry planner");
    tracing::info!("📁 Loading service descriptors from: {}", args.config);

    let config = match RegistryConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load descriptor file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!(
            "❌ Configuration validation failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    let monitor = SystemMonitor::new(args.monitor || config.monitoring_enabled());
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let gate = config.platform_gate(args.platform.as_deref(), args.editor);
    let plan = RegistrationPlan::build(&config.services, &gate);
    monitor.log_stats("Plan built.");

    display_plan(&config, &plan, args.dry_run);

    let export_path = args.export.clone().or_else(|| {
        config
            .monitoring
            .as_ref()
            .and_then(|m| m.export_report.clone())
    });
    if let Some(path) = export_path {
        std::fs::write(&path, plan.to_json_pretty()?)?;
        tracing::info!("📊 Plan exported to: {}", path);
        println!("📊 Plan exported to: {}", path);
    }

    Ok(())
}

fn display_plan(config: &RegistryConfig, plan: &RegistrationPlan, detailed: bool) {
    println!("📋 Service Registry: {}", config.registry.name);
    if let Some(description) = &config.registry.description {
        println!("  Description: {}", description);
    }
    println!("  Active platform: {}", plan.platform);
    println!("  Descriptors: {}", plan.entries.len());
    println!();

    println!("📝 Registration Order:");
    for entry in &plan.entries {
        let (status, detail) = match &entry.action {
            PlannedAction::Attempt => ("✅", String::new()),
            PlannedAction::Conflict { interface } => {
                ("⚠️", format!(" ({} already claimed)", interface))
            }
            PlannedAction::Skip(reason) => ("⏭️", format!(" ({})", reason)),
        };
        let indent = if entry.parent.is_some() { "    " } else { "  " };
        println!(
            "{}{}. {} {} -> {}{}",
            indent, entry.position, status, entry.name, entry.interface, detail
        );

        if detailed {
            if let Some(descriptor) = config.get_service(&entry.name) {
                println!(
                    "{}     concrete: {}, priority: {}",
                    indent, descriptor.concrete, descriptor.priority
                );
                if !descriptor.platforms.is_empty() {
                    let platforms: Vec<&str> =
                        descriptor.platforms.iter().map(|p| p.as_str()).collect();
                    println!("{}     platforms: {}", indent, platforms.join(", "));
                }
            }
        }
    }
    println!();

    println!("▶️ Startup Order (by priority):");
    for (index, entry) in plan.startup_order().iter().enumerate() {
        println!("  {}. {} (priority {})", index + 1, entry.name, entry.priority);
    }
    println!();
}

use clap::Parser;
use jaxon_core::config::toml_config::AppConfig;
use jaxon_core::utils::{logger, validation::Validate};
use jaxon_core::{ClassCatalog, CliConfig, Container, Jaxon, JaxonConfig};
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(cli.log_format, cli.verbose);

    tracing::info!("Checking Jaxon configuration {}", cli.config);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match JaxonConfig::from_file(&cli.config).and_then(|config| {
        cli.validate()?;
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration check failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // 函式由應用程式以程式碼提供, 這裡只檢查類別與目錄
    let app = AppConfig {
        functions: Vec::new(),
        ..config.app.clone()
    };
    let jaxon = Jaxon::new(config.lib.clone(), ClassCatalog::new(), Container::new())?;
    if let Err(e) = jaxon.register_app(&app, &HashMap::new()) {
        tracing::error!("❌ Registration failed: {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let registry = jaxon.registry();
    let discovered = registry.parse_callable_classes()?;
    let repository = registry.repository();

    println!("✅ Configuration is valid");
    println!(
        "📦 {} classes, {} namespaces ({} discovered classes), {} functions",
        repository.class_names().len(),
        repository.namespaces().len(),
        discovered.len(),
        config.app.functions.len()
    );

    if cli.list {
        for class_name in repository.class_names() {
            println!("  class     {}", class_name);
        }
        for namespace in repository.namespaces() {
            println!(
                "  namespace {} -> {}",
                namespace.namespace,
                namespace.directory.display()
            );
        }
        for class_name in &discovered {
            println!("  found     {}", class_name);
        }
        for function in &config.app.functions {
            println!("  function  {}", function.name);
        }
    }

    println!("🔑 Script hash: {}", jaxon.get_hash()?);
    Ok(())
}

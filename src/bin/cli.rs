use anyhow::{anyhow, bail, Context};
use nacamera::platform::{backend_info, select_backend, CameraBackend};
use nacamera::{LensFacing, NaCameraConfig, PhotoOptions};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const READY_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nacamera::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: nacamera-cli <list|capabilities|capture|preview> [--front] [--flash] [--json]");
        std::process::exit(1);
    }

    let config = NaCameraConfig::load_or_default();
    let backend = select_backend(config).context("Failed to select a camera backend")?;

    let result = match args[1].as_str() {
        "list" => cmd_list(backend.as_ref(), &args).await,
        "capabilities" => cmd_capabilities(backend.as_ref(), &args).await,
        "capture" => cmd_capture(backend.as_ref(), &args).await,
        "preview" => cmd_preview(backend.as_ref(), &args).await,
        other => Err(anyhow!("Unknown command: {}", other)),
    };

    backend.shutdown().await;
    result
}

async fn prepare(backend: &dyn CameraBackend, args: &[String]) -> anyhow::Result<()> {
    if !backend.devices_available() {
        bail!("No camera available on {}", backend.name());
    }
    let permissions = backend.request_permissions().await;
    if !permissions.is_granted() {
        log::warn!("Permissions not granted: {}", permissions.message);
    }

    if !backend.wait_ready(READY_TIMEOUT).await {
        bail!("Camera did not become ready");
    }
    if args.iter().any(|a| a == "--front") {
        if !backend.set_device_position(LensFacing::Front).await {
            bail!("No front camera");
        }
        if !backend.wait_ready(READY_TIMEOUT).await {
            bail!("Front camera did not become ready");
        }
    }
    Ok(())
}

async fn cmd_list(backend: &dyn CameraBackend, args: &[String]) -> anyhow::Result<()> {
    let info = backend_info(backend);
    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string(&info)?);
    } else {
        println!(
            "{} backend on {} (convergence reporting: {})",
            info.backend,
            info.platform.as_str(),
            info.reports_convergence
        );
        for facing in [LensFacing::Back, LensFacing::Front, LensFacing::External] {
            if backend.has_device_position(facing).await {
                println!("  {} camera", facing);
            }
        }
    }
    Ok(())
}

async fn cmd_capabilities(backend: &dyn CameraBackend, args: &[String]) -> anyhow::Result<()> {
    prepare(backend, args).await?;
    let caps = backend.capabilities().await?;
    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string(&caps)?);
    } else {
        println!("Flash: {}  Torch: {}", caps.has_flash, caps.has_torch);
        let positions: Vec<_> = caps.positions.iter().map(|p| p.as_str()).collect();
        println!("Positions: {}", positions.join(", "));
        let sizes: Vec<_> = caps.jpeg_sizes.iter().map(|s| s.to_string()).collect();
        println!("JPEG sizes: {}", sizes.join(", "));
    }
    Ok(())
}

async fn cmd_capture(backend: &dyn CameraBackend, args: &[String]) -> anyhow::Result<()> {
    prepare(backend, args).await?;
    if args.iter().any(|a| a == "--flash") && !backend.set_flash_mode(true).await {
        log::warn!("Flash unsupported, capturing without it");
    }
    backend.wait_ready(READY_TIMEOUT).await;

    let path = backend
        .take_picture(PhotoOptions::default())
        .await
        .ok_or_else(|| anyhow!("Capture failed"))?;
    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("Saved {}", path.display());
    }
    Ok(())
}

async fn cmd_preview(backend: &dyn CameraBackend, args: &[String]) -> anyhow::Result<()> {
    prepare(backend, args).await?;
    backend.start().await?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    println!("Previewing on {}, press Ctrl-C to stop", backend.name());
    while running.load(Ordering::SeqCst) {
        let position = backend
            .device_position()
            .await
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "position={} flash={} torch={} ready={}",
            position,
            backend.flash_mode().await,
            backend.torch_mode().await,
            backend.is_ready().await
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    backend.stop().await?;
    Ok(())
}

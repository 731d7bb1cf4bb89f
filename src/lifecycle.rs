//! Idempotent container lifecycle control.
//!
//! Every operation re-reads the container's state from the runtime
//! immediately before acting; the runtime is the only source of truth and may
//! be mutated concurrently by other processes.
use crate::registry::TargetConfig;
use crate::runtime::{ContainerRuntime, ContainerState};
use anyhow::{bail, Result};

/// Make an image available locally, pulling it on demand.
pub fn ensure_image(runtime: &dyn ContainerRuntime, image: &str) -> Result<()> {
    if runtime.image_present(image)? {
        println!("  Image {image} already exists locally");
        return Ok(());
    }

    println!("  Pulling image {image}...");
    tracing::info!(%image, "pulling image");
    let out = runtime.pull_image(image)?;
    if !out.success {
        bail!("failed to pull image {image}: {}", out.stderr.trim());
    }
    println!("  Pulled image successfully");
    Ok(())
}

/// Bring a target's container to `running`, creating it if needed.
///
/// Already-running containers are left alone so repeated invocations are
/// safe in retry loops.
pub fn start_container(runtime: &dyn ContainerRuntime, target: &TargetConfig) -> Result<()> {
    let container = &target.container_name;
    match runtime.container_state(container)? {
        ContainerState::Running => {
            println!("  Container {container} is already running");
            Ok(())
        }
        ContainerState::Stopped => {
            println!("  Starting stopped container {container}...");
            let out = runtime.start_container(container)?;
            if !out.success {
                bail!("failed to start container {container}: {}", out.stderr.trim());
            }
            println!("  Started container");
            Ok(())
        }
        ContainerState::Absent => {
            ensure_image(runtime, &target.image)?;

            println!("  Creating container {container}...");
            tracing::info!(%container, image = %target.image, "creating container");
            let out = runtime.create_container(&target.run_spec())?;
            if !out.success {
                bail!(
                    "failed to create container {container}: {}",
                    out.stderr.trim()
                );
            }
            println!("  Created and started container");
            Ok(())
        }
    }
}

/// Stop a target's container if it is running.
pub fn stop_container(runtime: &dyn ContainerRuntime, target: &TargetConfig) -> Result<()> {
    let container = &target.container_name;
    match runtime.container_state(container)? {
        ContainerState::Absent => {
            println!("  Container {container} does not exist");
            Ok(())
        }
        ContainerState::Stopped => {
            println!("  Container {container} is already stopped");
            Ok(())
        }
        ContainerState::Running => {
            println!("  Stopping container {container}...");
            let out = runtime.stop_container(container)?;
            if !out.success {
                bail!("failed to stop container {container}: {}", out.stderr.trim());
            }
            println!("  Stopped container");
            Ok(())
        }
    }
}

/// Stop (when needed) and permanently remove a target's container.
pub fn remove_container(runtime: &dyn ContainerRuntime, target: &TargetConfig) -> Result<()> {
    let container = &target.container_name;
    match runtime.container_state(container)? {
        ContainerState::Absent => {
            println!("  Container {container} does not exist");
            return Ok(());
        }
        ContainerState::Running => stop_container(runtime, target)?,
        ContainerState::Stopped => {}
    }

    println!("  Removing container {container}...");
    let out = runtime.remove_container(container)?;
    if !out.success {
        bail!(
            "failed to remove container {container}: {}",
            out.stderr.trim()
        );
    }
    println!("  Removed container");
    Ok(())
}

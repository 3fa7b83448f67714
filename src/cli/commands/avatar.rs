//! Avatar display commands

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;

use termonaut_core::{next_evolution_level, style_info, Avatar, AvatarRequest};

use super::handle_cache_command;
use crate::avatar::{AvatarManager, FixedLevel, NetworkStatus};
use crate::cli::args::{resolve_size, resolve_username, validate_level, AvatarAction, AvatarTarget};
use crate::cli::ui::{progress, stdout_supports_color, strip_ansi, StatusPrinter};
use crate::config::TermonautConfig;

/// Execute an avatar command
pub async fn handle_avatar_command(
    action: &AvatarAction,
    config: &TermonautConfig,
    config_path: Option<&Path>,
    verbosity: u8,
) -> Result<()> {
    let printer = StatusPrinter::new();

    match action {
        AvatarAction::Show { target, details } => {
            let mut manager = open_manager(config)?;
            let request = build_request(target, &manager)?;
            let avatar = generate_with_spinner(&manager, request).await?;

            print_art(&avatar);
            if *details || verbosity > 0 {
                print_details(&printer, &avatar);
            }
            report_fallback(&printer, &avatar);
            manager.shutdown().await?;
        }

        AvatarAction::Preview { target } => {
            let mut manager = open_manager(config)?;
            let request = build_request(target, &manager)?;
            let level = request.level;
            let avatar = generate_with_spinner(&manager, request).await?;

            printer.info("Preview", &format!("{} at level {}", avatar.username, level));
            print_art(&avatar);
            match next_evolution_level(level) {
                Some(next) => printer.dim(&format!("Next evolution at level {}", next)),
                None => printer.dim("Final evolution reached"),
            }
            report_fallback(&printer, &avatar);
            manager.shutdown().await?;
        }

        AvatarAction::Refresh { user, level } => {
            validate_level(*level)?;
            let username = resolve_username(user.as_deref());
            let mut manager = open_manager(config)?.with_level_provider(Arc::new(FixedLevel(*level)));

            let spinner = progress::create_spinner("Regenerating avatar...");
            let result = manager.refresh(&username).await;
            spinner.finish_and_clear();
            let avatar = result.context("Failed to refresh avatar")?;

            printer.success("Refreshed", &format!("{} (level {})", avatar.username, avatar.level));
            print_art(&avatar);
            report_fallback(&printer, &avatar);
            manager.shutdown().await?;
        }

        AvatarAction::Styles => {
            printer.section("Available avatar styles");
            for style in termonaut_core::SUPPORTED_STYLES {
                let info = style_info(style);
                let marker = if *style == config.avatar.default_style {
                    " (default)"
                } else {
                    ""
                };
                let recommended = if info.recommended { " *" } else { "" };
                printer.bullet(&format!("{}{}{}", style, recommended, marker));
                if verbosity > 0 {
                    printer.dim(&info.description);
                }
            }
            eprintln!();
            printer.dim("* recommended for terminal display");
        }

        AvatarAction::Status => {
            let manager = open_manager(config)?;
            printer.kv("Service", &config.avatar.api_base_url);

            let spinner = progress::create_spinner("Checking avatar service...");
            let status = manager.network_status().await;
            spinner.finish_and_clear();

            match status {
                NetworkStatus::Online => printer.success("Online", "Avatar service is reachable"),
                NetworkStatus::Offline(e) => {
                    printer.warning("Offline", &e.to_string());
                    printer.dim("Avatars will be generated locally until the service is back");
                }
                NetworkStatus::ServiceError(e) => printer.error("Error", &e.to_string()),
            }
        }

        AvatarAction::Config { style: None, size: None } => {
            let text = config.to_toml().context("Failed to render configuration")?;
            println!("{}", text);
        }

        AvatarAction::Config { style, size } => {
            let path = TermonautConfig::writable_config_path(config_path)
                .ok_or_else(|| anyhow!("Could not determine a config file location"))?;
            let saved = TermonautConfig::persist_defaults(&path, style.as_deref(), size.as_deref())
                .with_context(|| format!("Failed to save configuration to {}", path.display()))?;

            printer.success("Saved", &path.display().to_string());
            printer.kv("Style", &saved.avatar.default_style);
            printer.kv("Size", &saved.avatar.default_size);
        }

        AvatarAction::Stats
        | AvatarAction::Evict { .. }
        | AvatarAction::Sweep
        | AvatarAction::Clear { .. } => {
            return handle_cache_command(action, config).await;
        }
    }

    Ok(())
}

fn open_manager(config: &TermonautConfig) -> Result<AvatarManager> {
    AvatarManager::new(&config.avatar).context("Failed to initialize avatar manager")
}

fn build_request(target: &AvatarTarget, manager: &AvatarManager) -> Result<AvatarRequest> {
    validate_level(target.level)?;
    let username = resolve_username(target.user.as_deref());
    let size = resolve_size(target.size.as_deref(), manager.default_size())?;
    let style = target
        .style
        .clone()
        .unwrap_or_else(|| manager.default_style().to_string());

    Ok(AvatarRequest::new(username, target.level, style, size))
}

async fn generate_with_spinner(manager: &AvatarManager, request: AvatarRequest) -> Result<Avatar> {
    let spinner = progress::create_spinner("Generating avatar...");
    let result = manager.generate(request).await;
    spinner.finish_and_clear();
    result.context("Failed to generate avatar")
}

fn print_art(avatar: &Avatar) {
    if stdout_supports_color() {
        println!("{}", avatar.ascii_art);
    } else {
        println!("{}", strip_ansi(&avatar.ascii_art));
    }
}

fn print_details(printer: &StatusPrinter, avatar: &Avatar) {
    printer.section("Avatar");
    printer.kv("User", &avatar.username);
    printer.kv("Level", &avatar.level.to_string());
    printer.kv("Style", &avatar.style);
    printer.kv("Size", &avatar.size.to_string());
    printer.kv("Seed", &avatar.seed);
    printer.kv("Generated", &avatar.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    printer.kv("Fingerprint", &avatar.fingerprint);
}

fn report_fallback(printer: &StatusPrinter, avatar: &Avatar) {
    if avatar.is_fallback() {
        printer.warning("Offline", "Avatar service unavailable, showing a local avatar");
    }
}

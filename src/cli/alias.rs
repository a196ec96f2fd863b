//! Alias and harvest whitelist commands

use anyhow::Result;

use betterhub::aliasing::{
    add_entry, remove_entry, set_allow_all, AliasBook, AliasDeepLink, AliasUpdate,
};
use betterhub::settings::{AliasDisplay, AliasItem, AliasKind, HarvestWhitelist, WhitelistKind};

use super::{print_json, CliContext};
use crate::commands::{AliasCommands, DisplayMode, WhitelistCommands};

fn display_label(item: &AliasItem) -> String {
    match &item.display {
        AliasDisplay::Plain => "plain".to_string(),
        AliasDisplay::Color(color) => format!("color {}", color),
        AliasDisplay::Icon(icon) if icon.is_empty() => "icon".to_string(),
        AliasDisplay::Icon(icon) if icon.starts_with("data:") => "icon (embedded)".to_string(),
        AliasDisplay::Icon(icon) => format!("icon {}", icon),
    }
}

fn list_command(book: &AliasBook, kind: Option<AliasKind>, json: bool) -> Result<()> {
    let kinds: Vec<AliasKind> = kind.map_or_else(|| AliasKind::ALL.to_vec(), |k| vec![k]);

    if json {
        let mut out = serde_json::Map::new();
        for kind in kinds {
            out.insert(
                kind.list_key().to_string(),
                serde_json::to_value(book.list(kind)?)?,
            );
        }
        return print_json(&out);
    }

    for kind in kinds {
        let items = book.list(kind)?;
        println!("{} ({}):", kind.list_key(), items.len());
        for item in items {
            let link = AliasDeepLink::new(kind, &item.original);
            println!(
                "  {}{} -> {}  [{}]  {}",
                if item.enabled { "" } else { "(disabled) " },
                item.original,
                item.alias,
                display_label(&item),
                link
            );
        }
    }
    Ok(())
}

pub fn alias_command(ctx: &CliContext, command: AliasCommands) -> Result<()> {
    let book = AliasBook::new(ctx.settings_manager()?);
    match command {
        AliasCommands::List { kind, json } => list_command(&book, kind, json)?,
        AliasCommands::Add {
            kind,
            original,
            alias,
        } => {
            let item = book.add_alias(kind, &original, &alias)?;
            println!("Added {} alias {} -> {}", kind, item.original, item.alias);
        }
        AliasCommands::Rename {
            kind,
            original,
            alias,
        } => {
            let item = book.update_alias(
                kind,
                &original,
                AliasUpdate {
                    alias: Some(alias),
                    ..Default::default()
                },
            )?;
            println!("{} -> {}", item.original, item.alias);
        }
        AliasCommands::Remove { kind, original } => {
            if book.remove_alias(kind, &original)? {
                println!("Removed {} alias {}", kind, original);
            } else {
                println!("No {} alias for {}", kind, original);
            }
        }
        AliasCommands::Display {
            kind,
            original,
            mode,
        } => {
            let item = match mode {
                DisplayMode::Color => book.set_display_color(kind, &original)?,
                DisplayMode::Icon => book.set_display_icon(kind, &original)?,
                DisplayMode::Plain => book.set_display_plain(kind, &original)?,
            };
            println!("{}: {}", item.original, display_label(&item));
        }
        AliasCommands::Toggle { kind, original } => {
            let current = book
                .list(kind)?
                .into_iter()
                .find(|item| betterhub::settings::same_name(&item.original, &original))
                .map(|item| item.enabled)
                .unwrap_or(true);
            let item = book.update_alias(
                kind,
                &original,
                AliasUpdate {
                    enabled: Some(!current),
                    ..Default::default()
                },
            )?;
            println!(
                "{} alias {} {}",
                kind,
                item.original,
                if item.enabled { "enabled" } else { "disabled" }
            );
        }
    }
    Ok(())
}

fn print_whitelist(kind: WhitelistKind, whitelist: &HarvestWhitelist) {
    match whitelist {
        HarvestWhitelist::All => println!("{} whitelist: all", kind),
        HarvestWhitelist::List(entries) if entries.is_empty() => {
            println!("{} whitelist: (empty, harvesting only off {} pages)", kind, kind)
        }
        HarvestWhitelist::List(entries) => {
            println!("{} whitelist:", kind);
            for entry in entries {
                println!("  {}", entry);
            }
        }
    }
}

pub fn whitelist_command(ctx: &CliContext, kind: WhitelistKind, command: WhitelistCommands) -> Result<()> {
    let manager = ctx.settings_manager()?;
    match command {
        WhitelistCommands::Show => {
            let settings = manager.get_settings()?;
            print_whitelist(kind, settings.aliasing.whitelist(kind));
        }
        WhitelistCommands::All { off } => {
            print_whitelist(kind, &set_allow_all(&manager, kind, !off)?);
        }
        WhitelistCommands::Add { name } => {
            print_whitelist(kind, &add_entry(&manager, kind, &name)?);
        }
        WhitelistCommands::Remove { name } => {
            if !remove_entry(&manager, kind, &name)? {
                println!("{} is not in the {} whitelist", name, kind);
            }
            let settings = manager.get_settings()?;
            print_whitelist(kind, settings.aliasing.whitelist(kind));
        }
    }
    Ok(())
}

//! Commands that run the aliasing passes over a saved page

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use betterhub::aliasing::{harvest, harvest_allowed, AliasBook, AliasingController, AppliedNodes};
use betterhub::dom::Page;
use betterhub::settings::AliasKind;

use super::{print_json, CliContext};

fn load_page(url: &str, file: &Path) -> Result<Page> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Page::parse(url, &html).with_context(|| format!("Invalid page URL: {}", url))
}

/// Print every user, project and org found on the page
pub fn harvest_command(ctx: &CliContext, url: &str, file: &Path, save: bool) -> Result<()> {
    let page = load_page(url, file)?;
    let applied = AppliedNodes::new();
    let found: Vec<_> = AliasKind::ALL
        .into_iter()
        .flat_map(|kind| harvest(&page, &applied, kind))
        .collect();
    print_json(&found)?;

    if save {
        let book = AliasBook::new(ctx.settings_manager()?);
        let settings = book.manager().get_settings()?;
        if !harvest_allowed(&settings.aliasing, &page.url) {
            eprintln!("Harvesting is not allowed on {} by the whitelist, nothing saved", url);
            return Ok(());
        }
        let added = book.harvest_new(&found)?;
        eprintln!("Saved {} new of {} found", added, found.len());
    }
    Ok(())
}

/// Page load as the content script would run it
pub fn apply_command(ctx: &CliContext, url: &str, file: &Path, output: Option<&PathBuf>) -> Result<()> {
    let mut page = load_page(url, file)?;
    let book = AliasBook::new(ctx.settings_manager()?);
    let controller = AliasingController::new(book, ctx.config.harvest.avatar_fetcher())
        .with_cooldown(ctx.config.harvest.cooldown());
    let report = controller.on_page_load(&mut page)?;
    eprintln!("{}", serde_json::to_string(&report)?);

    let html = page.document.to_html();
    match output {
        Some(path) => std::fs::write(path, html)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", html),
    }
    Ok(())
}

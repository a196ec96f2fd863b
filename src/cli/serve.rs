//! Serve command implementation

use anyhow::Result;

use betterhub::registry::FeatureRegistry;
use betterhub::server::{serve, ApiState};

use super::CliContext;

pub fn serve_command(ctx: &CliContext, port: Option<u16>) -> Result<()> {
    let manager = ctx.settings_manager()?;
    let state = ApiState::new(manager, FeatureRegistry::with_builtin());
    let port = port.unwrap_or(ctx.config.server.port);
    let token = ctx.config.server.auth_token().map(str::to_string);
    serve(state, port, token)
}

//! `drift profile` -- manage saved connection profiles.

use anyhow::Context as _;
use drift_config::{ConnectionProfile, ProfileStore};

use crate::cli::{ProfileArgs, ProfileCommands};
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &ProfileArgs) -> anyhow::Result<()> {
    let path = ctx.profiles_path();
    let mut store =
        ProfileStore::load(&path).with_context(|| format!("loading {}", path.display()))?;

    match &args.command {
        ProfileCommands::List => {
            if ctx.json {
                let profiles: std::collections::BTreeMap<_, _> = store.iter().collect();
                println!("{}", serde_json::to_string_pretty(&profiles)?);
                return Ok(());
            }
            if store.is_empty() {
                println!("No profiles saved.");
                return Ok(());
            }
            for (name, profile) in store.iter() {
                println!(
                    "{name}: {}@{}:{}/{}",
                    profile.user, profile.host, profile.port, profile.schema
                );
            }
            Ok(())
        }
        ProfileCommands::Show { name } => {
            let profile = store
                .get(name)
                .with_context(|| format!("profile '{name}' not found"))?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(profile)?);
                return Ok(());
            }
            println!("Profile: {name}");
            println!("  Host:   {}", profile.host);
            println!("  Port:   {}", profile.port);
            println!("  User:   {}", profile.user);
            println!("  Schema: {}", profile.schema);
            if !profile.description.is_empty() {
                println!("  Notes:  {}", profile.description);
            }
            Ok(())
        }
        ProfileCommands::Save {
            name,
            host,
            port,
            user,
            schema,
            description,
        } => {
            store.upsert(
                name.clone(),
                ConnectionProfile {
                    host: host.clone(),
                    port: *port,
                    user: user.clone(),
                    schema: schema.clone(),
                    description: description.clone(),
                },
            )?;
            store.save()?;
            if !ctx.quiet {
                println!("Profile '{name}' saved.");
            }
            Ok(())
        }
        ProfileCommands::Delete { name } => {
            if !store.remove(name) {
                anyhow::bail!("profile '{name}' not found");
            }
            store.save()?;
            if !ctx.quiet {
                println!("Profile '{name}' deleted.");
            }
            Ok(())
        }
    }
}

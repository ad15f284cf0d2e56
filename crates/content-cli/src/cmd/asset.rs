use super::{Context, save};
use anyhow::{Result, bail};
use content_core::check::AssetDescriptor;
use content_schema::{ContentHash, Status};
use std::path::Path;

/// Options for `asset add`.
#[derive(Debug, Clone)]
pub struct AddOptions {
    pub path: String,
    pub name: Option<String>,
    pub type_name: String,
    pub base_type: String,
    pub id: Option<String>,
}

impl AddOptions {
    fn descriptor(&self) -> AssetDescriptor {
        let name = self.name.clone().unwrap_or_else(|| {
            Path::new(&self.path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.clone())
        });
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| ContentHash::compute(self.path.as_bytes()).into_string());
        AssetDescriptor::new(name, self.path.clone(), id, self.type_name.clone(), self.base_type.clone())
    }
}

fn rejected(status: Status) -> Result<()> {
    if status.is_ok() {
        Ok(())
    } else {
        bail!("Rejected: {status}")
    }
}

pub async fn add(ctx: &Context, addon: &str, bundle: &str, options: &AddOptions) -> Result<()> {
    let mut catalog = ctx.open().await;
    let descriptor = options.descriptor();
    rejected(catalog.add_asset(addon, bundle, &descriptor))?;
    save(&mut catalog).await?;
    ctx.reporter.success(&format!(
        "Added '{}' to '{addon}/{bundle}' (id {})",
        descriptor.name, descriptor.content_id
    ));
    Ok(())
}

pub async fn remove(ctx: &Context, id: &str) -> Result<()> {
    let mut catalog = ctx.open().await;
    let Some(removed) = catalog.remove_asset(id) else {
        bail!("No asset with id '{id}'");
    };
    save(&mut catalog).await?;
    ctx.reporter
        .success(&format!("Removed '{}' ({})", removed.name(), removed.path()));
    Ok(())
}

pub async fn move_to(ctx: &Context, id: &str, addon: &str, bundle: &str) -> Result<()> {
    let mut catalog = ctx.open().await;
    rejected(catalog.move_asset(id, addon, bundle))?;
    save(&mut catalog).await?;
    ctx.reporter.success(&format!("Moved '{id}' to '{addon}/{bundle}'"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(path: &str) -> AddOptions {
        AddOptions {
            path: path.to_string(),
            name: None,
            type_name: "Texture2D".to_string(),
            base_type: "Texture".to_string(),
            id: None,
        }
    }

    #[test]
    fn defaults_come_from_path() {
        let descriptor = options("Assets/Guns/ak.png").descriptor();
        assert_eq!(descriptor.name, "ak");
        assert_eq!(descriptor.content_id, ContentHash::compute(b"Assets/Guns/ak.png").as_str());
    }

    #[test]
    fn explicit_values_win() {
        let mut opts = options("Assets/ak.png");
        opts.name = Some("rifle".into());
        opts.id = Some("guid-1".into());
        let descriptor = opts.descriptor();
        assert_eq!(descriptor.name, "rifle");
        assert_eq!(descriptor.content_id, "guid-1");
    }
}

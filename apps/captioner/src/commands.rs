use crate::{
    ctx::traits::CtxStore,
    progress::print_notifications,
    settings::{mask_secret, SettingKey, Settings},
};
use anyhow::{bail, Context};
use caption_base::{
    list_images, CaptionBuffer, CaptionNormalizer, FsSidecarStore, ImageRef, SidecarStore,
};
use caption_base_pool::{CaptionJobState, CaptionPool, RunPhase};
use std::{io::Write, path::Path, str::FromStr};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

pub async fn list(dir: &Path) -> anyhow::Result<()> {
    let images = list_images(dir)
        .await
        .with_context(|| format!("failed to read {}", dir.display()))?;

    for image in images {
        let caption = FsSidecarStore.load(&image).await?;
        if caption.is_empty() {
            println!("{}", image.file_name());
        } else {
            println!("{}\t{}", image.file_name(), caption);
        }
    }

    Ok(())
}

pub async fn show(path: &Path) -> anyhow::Result<()> {
    let image = image_ref(path)?;
    let caption = FsSidecarStore.load(&image).await?;
    if caption.is_empty() {
        println!("{} has no caption", image.file_name());
    } else {
        println!("{}", caption);
    }
    Ok(())
}

/// Replace the caption of one image with `text`, normalized.
pub async fn edit(path: &Path, text: &str) -> anyhow::Result<String> {
    let image = image_ref(path)?;
    let mut buffer =
        CaptionBuffer::load(image, &FsSidecarStore, CaptionNormalizer::default()).await?;
    buffer.set_text(text);
    if buffer.is_dirty() {
        buffer.save(&FsSidecarStore).await?;
        tracing::info!("caption of {} updated", buffer.target());
    }
    Ok(buffer.text().to_string())
}

pub struct CaptionArgs<'a> {
    pub dir: &'a Path,
    pub only: &'a [String],
    pub prepend: Option<String>,
    pub append: Option<String>,
    pub yes: bool,
}

pub async fn caption(settings: &Settings, args: CaptionArgs<'_>) -> anyhow::Result<()> {
    let targets = select_targets(args.dir, args.only).await?;

    if targets.len() > 1 && !args.yes {
        let question = format!(
            "Caption {} images? Existing captions will be overwritten.",
            targets.len()
        );
        if !confirm(&question).await? {
            println!("Aborted");
            return Ok(());
        }
    }

    let prepend_text = args.prepend.unwrap_or_else(|| settings.prepend_text.clone());
    let append_text = args.append.unwrap_or_else(|| settings.append_text.clone());

    let (tx, rx) = mpsc::channel(64);
    let pool = CaptionPool::new(settings.caption_ctx()?)?.with_notifier(tx);
    pool.start_run(targets, &prepend_text, &append_text)?;

    let printer = tokio::spawn(print_notifications(rx));

    let state = tokio::select! {
        state = pool.wait() => state,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received, cancelling caption run...");
            pool.cancel();
            pool.wait().await
        }
    };

    // the run task holds the last sender, the printer ends with it
    drop(pool);
    if let Err(e) = printer.await {
        tracing::error!("progress printer failed: {}", e);
    }

    print_summary(&state);
    Ok(())
}

fn print_summary(state: &CaptionJobState) {
    match state.phase() {
        RunPhase::Cancelled => println!(
            "Cancelled after {} of {} images",
            state.current_index(),
            state.total()
        ),
        _ => println!("Captioned {} images", state.total()),
    }
    if !state.failed().is_empty() {
        println!("{} failed:", state.failed().len());
        for failure in state.failed() {
            println!("  {}: {}", failure.target.file_name(), failure.message);
        }
    }
}

/// Every image in `dir`, or the ones named in `only`.
async fn select_targets(dir: &Path, only: &[String]) -> anyhow::Result<Vec<ImageRef>> {
    let images = list_images(dir)
        .await
        .with_context(|| format!("failed to read {}", dir.display()))?;
    if only.is_empty() {
        return Ok(images);
    }

    only.iter()
        .map(|name| {
            images
                .iter()
                .find(|image| image.file_name() == *name)
                .cloned()
                .with_context(|| format!("{} is not an image in {}", name, dir.display()))
        })
        .collect()
}

fn image_ref(path: &Path) -> anyhow::Result<ImageRef> {
    if !ImageRef::is_supported(path) {
        bail!("{} is not a supported image", path.display());
    }
    Ok(ImageRef::new(path))
}

async fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(is_confirmation(&answer))
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn config_get(store: &impl CtxStore, key: Option<&str>) -> anyhow::Result<()> {
    let keys = match key {
        Some(key) => vec![parse_key(key)?],
        None => SettingKey::all(),
    };

    for key in keys {
        let value = store.get(&key.to_string()).unwrap_or_default();
        let value = if key.is_secret() {
            mask_secret(&value)
        } else {
            value
        };
        println!("{} = {}", key, value);
    }
    Ok(())
}

/// An empty value removes the key.
pub fn config_set(store: &mut impl CtxStore, key: &str, value: &str) -> anyhow::Result<()> {
    let key = parse_key(key)?.to_string();
    if value.is_empty() {
        store.delete(&key)?;
    } else {
        store.insert(&key, value)?;
    }
    store.save()?;
    Ok(())
}

fn parse_key(key: &str) -> anyhow::Result<SettingKey> {
    SettingKey::from_str(key).map_err(|_| {
        let known: Vec<String> = SettingKey::all().iter().map(|v| v.to_string()).collect();
        anyhow::anyhow!("unknown setting {}, expected one of {}", key, known.join(", "))
    })
}

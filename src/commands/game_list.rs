use super::{fetch_manifest, prompt};
use anyhow::Result;
use hypdl::transfer::file_name_for;
use hypdl::{Config, GameNameIndex};

pub fn run() -> Result<()> {
    let config = Config::load()?;
    let path = config.name_index_path()?;
    let manifest = fetch_manifest(&config)?;

    let existing = GameNameIndex::load(&path).unwrap_or_default();

    println!("Each game is identified by an ID. Use this tool to name the corresponding game ID.");
    if !existing.is_empty() {
        println!("Press Enter to keep the current name.");
    }

    loop {
        let mut names = GameNameIndex::new();

        for game in &manifest.games {
            println!();
            if let Some(file) = game.sample_file() {
                let name = file_name_for(&file.url).unwrap_or_default();
                println!("File name: {}", name);
                println!("URL: {}", file.url);
            }
            println!("BIZ: {}", game.business_tag);

            let current = existing.label(&game.id);
            let prompt_text = match current {
                Some(label) => format!("ID: {} [{}] -> ", game.id, label),
                None => format!("ID: {} -> ", game.id),
            };

            let Some(input) = prompt::line(&prompt_text)? else {
                anyhow::bail!("No input received, game list not saved");
            };

            let label = match (input.is_empty(), current) {
                (true, Some(label)) => label.to_string(),
                _ => input,
            };
            names.insert(game.id.clone(), label);
        }

        println!();
        if prompt::yes_no("Confirm completion and save changes (y/N) ", false)? {
            names.save(&path)?;
            println!("✓ Saved {} game name(s) to {}", names.len(), path.display());
            return Ok(());
        }
    }
}

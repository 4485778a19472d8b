use std::sync::Arc;

use clap::{Arg, Command};
use inline_translator::{
    BubbleState, BundleLoader, DirectChannel, JsonFileBackend, MemoryBackend, MemoryDocument,
    MockChannel, MockReply, SelectionSnapshot, SelectionTranslator, SettingsStore,
    TranslationRelay, UiMessages,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("inline-translate")
        .version("0.1.0")
        .about("Translate a text snippet through the inline translation pipeline")
        .arg(
            Arg::new("text")
                .help("Text to translate (max 500 characters)")
                .required_unless_present("languages")
                .index(1),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .short('t')
                .help("Target language code (default: from settings)"),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .short('s')
                .help("Source language code (default: from settings)"),
        )
        .arg(
            Arg::new("bundle-dir")
                .long("bundle-dir")
                .short('d')
                .help("Directory with settings.json and languages.json")
                .default_value("data"),
        )
        .arg(
            Arg::new("settings-file")
                .long("settings-file")
                .help("JSON file holding saved user settings"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock channel instead of the translation API")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("languages")
                .long("languages")
                .help("List the available language options and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Show the effective settings and request details")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let bundle = BundleLoader::new(matches.get_one::<String>("bundle-dir").unwrap());

    // Initialize tracing; the bundled debug flag raises the default level too
    let bundled_debug = bundle
        .load_default_config()
        .ok()
        .and_then(|config| config.debug)
        .unwrap_or(false);
    let default_level = if verbose || bundled_debug {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().unwrap()),
        )
        .init();

    if matches.get_flag("languages") {
        for option in bundle.language_options_or_builtin() {
            println!("{}\t{}", option.code, option.label);
        }
        return Ok(());
    }

    let text = matches.get_one::<String>("text").unwrap();

    let store = match matches.get_one::<String>("settings-file") {
        Some(path) => Arc::new(SettingsStore::new(
            Arc::new(JsonFileBackend::new(path)),
            bundle.effective_defaults(),
        )),
        None => Arc::new(SettingsStore::new(
            Arc::new(MemoryBackend::new()),
            bundle.effective_defaults(),
        )),
    };

    // CLI language overrides sit on top of whatever storage holds.
    let mut settings = store.load().await;
    if let Some(source) = matches.get_one::<String>("source") {
        settings.source_lang = source.clone();
    }
    if let Some(target) = matches.get_one::<String>("target") {
        settings.target_lang = target.clone();
    }
    store.apply_external_change(&serde_json::to_value(&settings)?);

    if verbose {
        println!("📝 Source: \"{}\"", text);
        println!(
            "🌍 {} → {}",
            settings.source_lang, settings.target_lang
        );
        println!();
    }

    let mut doc = MemoryDocument::new();
    doc.append_text(text.clone());
    let selection = SelectionSnapshot::of_text(text.clone());

    let id = if matches.get_flag("mock") {
        let translator = SelectionTranslator::new(
            store,
            MockChannel::new(MockReply::Suffix),
            UiMessages::default_ui(),
        );
        translator.translate_selection(&selection, &mut doc).await
    } else {
        let relay = TranslationRelay::new(UiMessages::default_ui())?;
        let translator = SelectionTranslator::new(
            store,
            DirectChannel::new(relay),
            UiMessages::default_ui(),
        );
        translator.translate_selection(&selection, &mut doc).await
    };

    let bubble = doc
        .bubble(id)
        .ok_or("translation produced no bubble")?;
    if bubble.state() == BubbleState::Error {
        eprintln!("❌ {}", bubble.text());
        return Err("translation failed".into());
    }

    println!("{}", doc.render());
    Ok(())
}

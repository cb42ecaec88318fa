//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vis_analysis::resolver::{self, field};
use vis_analysis::{
    available_display_modes, contract, required_arity, Analyzer, DirectionDisplay, DisplayMode,
    ExperimentConfiguration, ExperimentRequest, Experimenter, IntervalSize, LabelSettings,
    MetadataCorrection, ObjectKind, PartCombination, Piece, RenderContract, Repeats, ResultSet, SortKey,
    SortOrder,
};
use visconf::{ConfigSources, LabelsConfig, VisConfig};

/// Read a piece from JSON, applying metadata corrections if given.
///
/// A document without a `source` is identified by its path.
pub fn load_piece(path: &Path, corrections: Option<&Path>) -> Result<Arc<Piece>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read piece {}", path.display()))?;
    let mut piece = Piece::from_json_with_source(&json, &path.display().to_string())
        .with_context(|| format!("Failed to parse piece {}", path.display()))?;

    if let Some(corrections) = corrections {
        let json = std::fs::read_to_string(corrections)
            .with_context(|| format!("Failed to read corrections {}", corrections.display()))?;
        let correction: MetadataCorrection =
            serde_json::from_str(&json).context("Failed to parse metadata corrections")?;
        piece = piece
            .with_corrections(&correction)
            .context("Failed to apply metadata corrections")?;
    }

    info!(title = %piece.title, parts = piece.parts.len(), "loaded piece");
    Ok(Arc::new(piece))
}

/// Display modes, contracts, and enabled fields for one object kind.
pub fn modes(kind: ObjectKind) -> String {
    let mut out = format!("{} (parts: {})\n", kind, required_arity(kind));
    for mode in available_display_modes(kind) {
        let enabled: Vec<&str> = [field::N, field::TOP_K, field::THRESHOLD, field::SORT, field::SORT_ORDER]
            .into_iter()
            .filter(|f| resolver::is_enabled(kind, mode, f))
            .collect();
        let contract = contract(kind, mode).map(contract_name).unwrap_or("-");
        out.push_str(&format!(
            "  {:<6} {:<16} fields: {}\n",
            mode.as_str(),
            contract,
            if enabled.is_empty() {
                "-".to_string()
            } else {
                enabled.join(", ")
            }
        ));
    }
    out
}

pub fn contract_name(contract: RenderContract) -> &'static str {
    match contract {
        RenderContract::FrequencyTable => "frequency table",
        RenderContract::AnnotatedScore => "annotated score",
        RenderContract::SummaryScore => "summary score",
    }
}

pub fn parts(piece: &Piece) -> String {
    let mut out = format!("{} ({})\n", piece.title, piece.source);
    for (index, part) in piece.parts.iter().enumerate() {
        out.push_str(&format!("  {:>2}  {} ({} events)\n", index, part.name, part.events.len()));
    }
    out
}

pub fn combos(piece: &Piece) -> String {
    let mut out = String::new();
    for pair in PartCombination::all_pairs(piece.parts.len()) {
        let names: Vec<&str> = pair.parts().iter().map(|&i| piece.parts[i].name.as_str()).collect();
        out.push_str(&format!("{}  {}\n", pair, names.join(" / ")));
    }
    out
}

/// Experiment options from the command line.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub kind: ObjectKind,
    pub mode: Option<DisplayMode>,
    pub parts: PartCombination,
    pub offset: Option<f64>,
    pub n: Option<usize>,
    pub top_k: Option<usize>,
    pub threshold: Option<usize>,
    pub sort: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    pub repeats: Option<Repeats>,
    pub simple: bool,
    pub no_quality: bool,
    pub direction: Option<String>,
    pub horizontal: bool,
}

/// Interval label style: config file first, command-line flags on top.
pub fn label_settings(labels: &LabelsConfig, args: &RunArgs) -> Result<LabelSettings> {
    let size = if args.simple {
        IntervalSize::Simple
    } else {
        match labels.size.as_str() {
            "simple" => IntervalSize::Simple,
            "compound" => IntervalSize::Compound,
            other => bail!("Unknown interval size '{}' (expected simple or compound)", other),
        }
    };

    let direction = args.direction.as_deref().unwrap_or(&labels.direction);
    let direction = match direction.to_lowercase().as_str() {
        "always" => DirectionDisplay::Always,
        "descending" => DirectionDisplay::DescendingOnly,
        "never" => DirectionDisplay::Never,
        other => bail!("Unknown direction display '{}' (expected always, descending, or never)", other),
    };

    Ok(LabelSettings {
        quality: labels.quality && !args.no_quality,
        size,
        direction,
        horizontal: labels.horizontal || args.horizontal,
    })
}

/// Build a request from flags, filling config defaults only into fields the
/// chosen kind and mode enable. Explicit flags are passed through untouched,
/// so a disabled one is reported by the resolver.
pub fn build_request(args: &RunArgs, config: &VisConfig) -> Result<ExperimentRequest> {
    let mode = args
        .mode
        .unwrap_or_else(|| available_display_modes(args.kind)[0]);
    let enabled = |name: &str| resolver::is_enabled(args.kind, mode, name);

    let config_sort: SortKey = config
        .experiment
        .sort
        .parse()
        .map_err(anyhow::Error::msg)
        .context("Invalid experiment.sort in config")?;
    let config_order: SortOrder = config
        .experiment
        .sort_order
        .parse()
        .map_err(anyhow::Error::msg)
        .context("Invalid experiment.sort_order in config")?;
    let config_repeats: Repeats = config
        .analysis
        .repeats
        .parse()
        .map_err(anyhow::Error::msg)
        .context("Invalid analysis.repeats in config")?;

    Ok(ExperimentRequest {
        object_kind: Some(args.kind),
        display_mode: Some(mode),
        n: args
            .n
            .or_else(|| enabled(field::N).then_some(config.experiment.ngram_n)),
        top_k: args
            .top_k
            .or_else(|| enabled(field::TOP_K).then_some(config.experiment.top_k)),
        part_combination: Some(args.parts.clone()),
        offset_interval: Some(args.offset.unwrap_or(config.analysis.offset_interval)),
        threshold: args.threshold,
        sort: args
            .sort
            .or_else(|| enabled(field::SORT).then_some(config_sort)),
        sort_order: args
            .sort_order
            .or_else(|| enabled(field::SORT_ORDER).then_some(config_order)),
        labels: Some(label_settings(&config.labels, args)?),
        repeats: Some(args.repeats.unwrap_or(config_repeats)),
    })
}

/// Everything a renderer needs for one experiment.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub title: String,
    pub source: String,
    pub part_names: Vec<String>,
    pub ticks_per_quarter: u32,
    pub configuration: ExperimentConfiguration,
    pub contract: RenderContract,
    pub result: ResultSet,
}

/// Resolve, analyze in the background (Ctrl-C cancels), then run.
pub async fn run(piece: Arc<Piece>, args: &RunArgs, config: &VisConfig) -> Result<RunReport> {
    let request = build_request(args, config)?;
    let analyzer = Arc::new(Analyzer::new());
    let experimenter = Experimenter::new(Arc::clone(&piece), Arc::clone(&analyzer)).with_request(request);

    let configuration = experimenter
        .resolve()
        .context("Invalid experiment configuration")?;

    let cancel = CancellationToken::new();
    let handle = analyzer.spawn_analysis_with(
        Arc::clone(&piece),
        configuration.part_combination.clone(),
        configuration.sampling(),
        cancel.clone(),
    );
    tokio::select! {
        result = handle.wait() => {
            result.context("Analysis failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, cancelling analysis");
            cancel.cancel();
            bail!("Analysis cancelled");
        }
    }

    let result = experimenter.run(&configuration).context("Experiment failed")?;

    Ok(RunReport {
        title: piece.title.clone(),
        source: piece.source.clone(),
        part_names: piece.parts.iter().map(|p| p.name.clone()).collect(),
        ticks_per_quarter: piece.ticks_per_quarter,
        contract: configuration.contract(),
        configuration,
        result,
    })
}

pub fn show_config(config: &VisConfig, sources: &ConfigSources) -> String {
    let mut out = String::new();
    if sources.files.is_empty() {
        out.push_str("# No config files found, using defaults\n");
    }
    for file in &sources.files {
        out.push_str(&format!("# Loaded: {}\n", file.display()));
    }
    for var in &sources.env_overrides {
        out.push_str(&format!("# Override: {}\n", var));
    }
    out.push('\n');
    out.push_str(&config.to_toml());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const PIECE: &str = r#"{
        "title": "Duo",
        "source": "duo.json",
        "parts": [
            {"name": "Violin", "events": [
                {"onset": 0, "duration": 480, "sounding": {"note": "E5"}},
                {"onset": 480, "duration": 480, "sounding": {"note": "F5"}},
                {"onset": 960, "duration": 480, "sounding": {"note": "E5"}}
            ]},
            {"name": "Cello", "events": [
                {"onset": 0, "duration": 480, "sounding": {"note": "C3"}},
                {"onset": 480, "duration": 480, "sounding": {"note": "D3"}},
                {"onset": 960, "duration": 480, "sounding": {"note": "C3"}}
            ]}
        ]
    }"#;

    fn args(kind: ObjectKind, mode: Option<DisplayMode>) -> RunArgs {
        RunArgs {
            kind,
            mode,
            parts: PartCombination::new([0, 1]),
            offset: None,
            n: None,
            top_k: None,
            threshold: None,
            sort: None,
            sort_order: None,
            repeats: None,
            simple: false,
            no_quality: false,
            direction: None,
            horizontal: false,
        }
    }

    fn piece() -> Arc<Piece> {
        Arc::new(Piece::from_json(PIECE).unwrap())
    }

    #[test]
    fn config_defaults_fill_only_enabled_fields() {
        let config = VisConfig::default();

        let note = build_request(&args(ObjectKind::Interval, None), &config).unwrap();
        assert_eq!(note.display_mode, Some(DisplayMode::List));
        assert_eq!(note.n, None);
        assert_eq!(note.top_k, None);
        assert_eq!(note.sort, Some(SortKey::Frequency));

        let summary = build_request(&args(ObjectKind::IntervalNGram, Some(DisplayMode::Score)), &config).unwrap();
        assert_eq!(summary.n, Some(2));
        assert_eq!(summary.top_k, Some(10));
        assert_eq!(summary.sort, None);
        assert_eq!(summary.sort_order, None);
        assert_eq!(summary.repeats, Some(Repeats::Keep));
    }

    #[test]
    fn ordering_and_repeats_come_from_config() {
        let mut config = VisConfig::default();
        config.experiment.sort_order = "ascending".into();
        config.analysis.repeats = "collapse".into();

        let request = build_request(&args(ObjectKind::Note, None), &config).unwrap();
        assert_eq!(request.sort_order, Some(SortOrder::Ascending));
        assert_eq!(request.repeats, Some(Repeats::Collapse));

        let mut a = args(ObjectKind::Note, None);
        a.sort_order = Some(SortOrder::Descending);
        a.repeats = Some(Repeats::Keep);
        let request = build_request(&a, &config).unwrap();
        assert_eq!(request.sort_order, Some(SortOrder::Descending));
        assert_eq!(request.repeats, Some(Repeats::Keep));

        config.analysis.repeats = "sometimes".into();
        assert!(build_request(&args(ObjectKind::Note, None), &config).is_err());
    }

    #[test]
    fn explicit_disabled_flag_is_reported() {
        let mut a = args(ObjectKind::Interval, None);
        a.top_k = Some(3);
        let request = build_request(&a, &VisConfig::default()).unwrap();
        let err = vis_analysis::resolve(&request, None).unwrap_err();
        assert_eq!(err.field(), field::TOP_K);
    }

    #[test]
    fn label_flags_override_config() {
        let mut a = args(ObjectKind::Interval, None);
        a.simple = true;
        a.direction = Some("never".into());
        let labels = label_settings(&LabelsConfig::default(), &a).unwrap();
        assert_eq!(labels.size, IntervalSize::Simple);
        assert_eq!(labels.direction, DirectionDisplay::Never);
        assert!(labels.quality);

        a.direction = Some("sideways".into());
        assert!(label_settings(&LabelsConfig::default(), &a).is_err());
    }

    #[test]
    fn listings() {
        let piece = piece();
        assert_eq!(combos(&piece), "[0,1]  Violin / Cello\n");
        assert!(parts(&piece).contains(" 1  Cello (3 events)"));
        assert!(modes(ObjectKind::Chord).contains("list"));
        assert!(!modes(ObjectKind::Chord).contains("score"));
        assert!(modes(ObjectKind::Note).contains("threshold, sort, sort_order"));
    }

    #[test]
    fn corrections_are_applied_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let piece_path = dir.path().join("duo.json");
        std::fs::write(&piece_path, PIECE).unwrap();
        let mut corrections = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        write!(corrections, r#"{{"title": "Duo in C", "part_names": {{"1": "Violoncello"}}}}"#).unwrap();

        let piece = load_piece(&piece_path, Some(corrections.path())).unwrap();
        assert_eq!(piece.title, "Duo in C");
        assert_eq!(piece.part_names(), vec!["Violin", "Violoncello"]);
    }

    #[test]
    fn sourceless_pieces_are_named_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let sourceless = PIECE.replace(r#""source": "duo.json","#, "");
        let first = dir.path().join("duo-a.json");
        let second = dir.path().join("duo-b.json");
        std::fs::write(&first, &sourceless).unwrap();
        std::fs::write(&second, &sourceless).unwrap();

        let a = load_piece(&first, None).unwrap();
        let b = load_piece(&second, None).unwrap();
        assert_eq!(a.title, b.title);
        assert_eq!(a.source, first.display().to_string());
        assert_ne!(a.source, b.source);
    }

    #[tokio::test]
    async fn run_produces_report() {
        let report = run(piece(), &args(ObjectKind::Interval, None), &VisConfig::default())
            .await
            .unwrap();
        assert_eq!(report.contract, RenderContract::FrequencyTable);
        let ResultSet::Frequencies(entries) = &report.result else {
            panic!("expected frequencies");
        };
        let got: Vec<(&str, usize)> = entries.iter().map(|e| (e.label.as_str(), e.count)).collect();
        assert_eq!(got, vec![("M17", 2), ("m17", 1)]);
    }

    #[tokio::test]
    async fn run_collapses_repeats_on_request() {
        let held = PIECE
            .replace(r#"{"note": "F5"}"#, r#"{"note": "E5"}"#)
            .replace(r#"{"note": "D3"}"#, r#"{"note": "C3"}"#);
        let piece = Arc::new(Piece::from_json(&held).unwrap());
        let mut a = args(ObjectKind::Interval, None);
        a.repeats = Some(Repeats::Collapse);
        let report = run(piece, &a, &VisConfig::default()).await.unwrap();
        let ResultSet::Frequencies(entries) = &report.result else {
            panic!("expected frequencies");
        };
        let got: Vec<(&str, usize)> = entries.iter().map(|e| (e.label.as_str(), e.count)).collect();
        assert_eq!(got, vec![("M17", 1)]);
    }

    #[tokio::test]
    async fn run_rejects_chord_score() {
        let err = run(
            piece(),
            &args(ObjectKind::Chord, Some(DisplayMode::Score)),
            &VisConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("display_mode"));
    }
}

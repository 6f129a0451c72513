use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use eab_gdd::cli::{Cli, Commands, FitArgs, InputArgs, ProjectionArgs};
use eab_gdd::ctx::{AnalysisConfig, Ctx, OutputPaths};
use eab_gdd::io;
use eab_gdd::model::{ModelSpec, Response, SamplerConfig};
use eab_gdd::pipeline::Pipeline;
use eab_gdd::records::{Direction, gdd_range};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = AnalysisConfig::default();
            apply_fit_args(&mut config, &args.fit);
            apply_projection_args(&mut config, &args.projection);
            config.missing_gdd = args.input.missing_gdd.into();
            if !args.models.is_empty() {
                config.models = args.models.iter().map(|&m| ModelSpec::from(m)).collect();
            }
            config.project_model = if args.no_project {
                None
            } else {
                Some(args.project.into())
            };
            config.reloo = args.reloo;

            let mut ctx = build_ctx(&args.input, args.out, args.fit.cache_dir, config);
            ctx.write_json = !args.no_json;
            ctx.write_tsv = !args.no_tsv;
            Pipeline::full().run(&mut ctx)?;
            print_summary(&ctx)?;
        }
        Commands::Project(args) => {
            let mut config = AnalysisConfig::default();
            apply_fit_args(&mut config, &args.fit);
            apply_projection_args(&mut config, &args.projection);
            config.missing_gdd = args.input.missing_gdd.into();
            config.models = Vec::new();
            config.project_model = Some(args.model.into());
            config.compare = false;

            let mut ctx = build_ctx(&args.input, args.out, args.fit.cache_dir, config);
            Pipeline::full().run(&mut ctx)?;
            print_summary(&ctx)?;
        }
        Commands::Validate(args) => {
            let mut config = AnalysisConfig::default();
            config.missing_gdd = args.input.missing_gdd.into();
            let mut ctx = build_ctx(&args.input, PathBuf::from("."), None, config);
            Pipeline::validate().run(&mut ctx)?;
            print_validate_summary(&ctx);
        }
        Commands::Models(args) => {
            let response: Response = args.response.into();
            for spec in ModelSpec::ALL {
                println!("{}\t{}", spec.name(), spec.formula(response));
            }
        }
    }

    Ok(())
}

fn build_ctx(
    input: &InputArgs,
    out: PathBuf,
    cache_dir: Option<PathBuf>,
    config: AnalysisConfig,
) -> Ctx {
    let mut ctx = Ctx::new(
        input.detections.clone(),
        input.gdd.clone(),
        out.clone(),
        config,
        env!("CARGO_PKG_VERSION"),
    );
    ctx.output = OutputPaths::new(out, cache_dir);
    ctx
}

fn apply_fit_args(config: &mut AnalysisConfig, args: &FitArgs) {
    config.response = args.response.into();
    config.sampler = SamplerConfig {
        iterations: args.iterations,
        warmup: args.warmup,
        chains: args.chains,
        adapt_delta: args.adapt_delta,
        seed: args.seed,
    };
    config.basis_dim = args.basis_dim;
    config.cache = args.cache.into();
    config.threads = args.threads;
}

fn apply_projection_args(config: &mut AnalysisConfig, args: &ProjectionArgs) {
    config.target = args.target;
    config.grid_points = args.grid_points;
    config.direction = args.direction.map(Direction);
}

fn print_summary(ctx: &Ctx) -> Result<()> {
    let summary = io::summary::format_summary(ctx)?;
    print!("{}", summary);
    if !ctx.warnings.is_empty() {
        println!("warnings:");
        for warning in &ctx.warnings {
            println!("- {}", warning);
        }
    }
    Ok(())
}

fn print_validate_summary(ctx: &Ctx) {
    println!("eab-gdd validate ok");
    if let Some(raw) = &ctx.raw {
        println!("trees: {}", raw.n_trees());
        println!("sampling columns: {}", raw.columns.len());
    }
    if let Some(gdd) = &ctx.gdd {
        println!("gdd days: {}", gdd.len());
    }
    println!("records: {}", ctx.records.len());
    println!("excluded: {}", ctx.excluded.len());
    let directions: Vec<String> = ctx.directions.iter().map(|d| d.to_string()).collect();
    println!("directions: {}", directions.join(","));
    if let Some((lo, hi)) = gdd_range(&ctx.records) {
        println!("gdd range: {:.1}..{:.1}", lo, hi);
    }
    if !ctx.warnings.is_empty() {
        println!("warnings:");
        for warning in &ctx.warnings {
            println!("- {}", warning);
        }
    }
}

use anyhow::Result;
use std::time::Instant;
use tracing::{info, warn};

use crate::ctx::Ctx;

pub mod stage0_scaffold;
pub mod stage1_input;
pub mod stage2_reshape;
pub mod stage3_fit;
pub mod stage4_compare;
pub mod stage5_project;
pub mod stage6_output;

pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut Ctx) -> Result<()>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Every stage, scaffold through output.
    pub fn full() -> Self {
        Self::new(vec![
            Box::new(stage0_scaffold::Stage0Scaffold::new()),
            Box::new(stage1_input::Stage1Input::new()),
            Box::new(stage2_reshape::Stage2Reshape::new()),
            Box::new(stage3_fit::Stage3Fit::new()),
            Box::new(stage4_compare::Stage4Compare::new()),
            Box::new(stage5_project::Stage5Project::new()),
            Box::new(stage6_output::Stage6Output::new()),
        ])
    }

    /// Input and reshape only.
    pub fn validate() -> Self {
        Self::new(vec![
            Box::new(stage1_input::Stage1Input::new()),
            Box::new(stage2_reshape::Stage2Reshape::new()),
        ])
    }

    pub fn run(&self, ctx: &mut Ctx) -> Result<()> {
        info!(
            threads = ctx.config.threads,
            fitter = %ctx.fitter.tag(),
            "pipeline started"
        );
        for stage in &self.stages {
            let start = Instant::now();
            info!(stage = stage.name(), "stage started");
            if let Err(err) = stage.run(ctx) {
                let elapsed_ms = start.elapsed().as_millis();
                warn!(
                    stage = stage.name(),
                    elapsed_ms = elapsed_ms as u64,
                    "stage failed"
                );
                return Err(err);
            }
            let elapsed_ms = start.elapsed().as_millis();
            info!(
                stage = stage.name(),
                elapsed_ms = elapsed_ms as u64,
                "stage finished"
            );
        }
        Ok(())
    }
}

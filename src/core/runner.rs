//! Apply a step to the pipelines a user selected.

use glob_match::glob_match;
use serde::Serialize;

use crate::cache::{BuildCache, DepsFile, NoCache};
use crate::error::{Error, Result};
use crate::manifest::{CacheConfig, LoadedManifest};
use crate::output::BulkResult;
use crate::pipeline::{run_step, Pipeline, PipelineContext, Step, StepOutput};
use crate::toolchain::{Rustc, Toolchain};
use crate::utils::validation::require_non_empty;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Memoize build/test through the deps file. `clean` always reads it.
    pub use_cache: bool,
    /// Continue with the remaining pipelines after one fails.
    pub keep_going: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            keep_going: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StepResult {
    Single(StepOutput),
    Bulk(BulkResult<StepOutput>),
}

/// Run `step` with the toolchain the manifest declares.
pub fn run(
    step: Step,
    loaded: &LoadedManifest,
    selectors: &[String],
    options: RunOptions,
) -> Result<(StepResult, i32)> {
    let toolchain = Rustc::new(&loaded.manifest.toolchain.program);
    run_with(
        step,
        &loaded.pipelines,
        selectors,
        &toolchain,
        &loaded.manifest.cache,
        options,
    )
}

/// Run `step` against an explicit toolchain.
///
/// One selected pipeline returns its output or error as-is. Several return a
/// bulk result; by default the first failure stops the run and the rest are
/// counted as skipped.
pub fn run_with(
    step: Step,
    pipelines: &[Pipeline],
    selectors: &[String],
    toolchain: &dyn Toolchain,
    cache_config: &CacheConfig,
    options: RunOptions,
) -> Result<(StepResult, i32)> {
    let selected = select(pipelines, selectors)?;

    if let [pipeline] = selected.as_slice() {
        let output = execute(step, pipeline, toolchain, cache_config, options)?;
        return Ok((StepResult::Single(output), 0));
    }

    let mut bulk = BulkResult::new(step.as_str());

    for (idx, pipeline) in selected.iter().enumerate() {
        match execute(step, pipeline, toolchain, cache_config, options) {
            Ok(output) => bulk.record_success(pipeline.id.clone(), output),
            Err(err) => {
                log_status!("kata", "{} {} failed: {}", step.as_str(), pipeline.id, err);
                bulk.record_failure(pipeline.id.clone(), &err);
                if !options.keep_going {
                    bulk.record_skipped(selected.len() - idx - 1);
                    break;
                }
            }
        }
    }

    let exit_code = if bulk.summary.failed > 0 { 1 } else { 0 };
    Ok((StepResult::Bulk(bulk), exit_code))
}

fn execute(
    step: Step,
    pipeline: &Pipeline,
    toolchain: &dyn Toolchain,
    cache_config: &CacheConfig,
    options: RunOptions,
) -> Result<StepOutput> {
    let mut cache = open_cache(step, pipeline, cache_config, options)?;
    let mut ctx = PipelineContext {
        toolchain,
        cache: cache.as_mut(),
    };
    run_step(step, pipeline, &mut ctx)
}

fn open_cache(
    step: Step,
    pipeline: &Pipeline,
    cache_config: &CacheConfig,
    options: RunOptions,
) -> Result<Box<dyn BuildCache>> {
    let memoize = options.use_cache && cache_config.enabled;
    if step == Step::Clean || memoize {
        Ok(Box::new(DepsFile::open(
            pipeline.root.join(&cache_config.file),
            &pipeline.id,
        )?))
    } else {
        Ok(Box::new(NoCache))
    }
}

/// Resolve selectors (ids or glob patterns) to pipelines in manifest order.
/// No selectors means every pipeline.
pub fn select<'a>(pipelines: &'a [Pipeline], selectors: &[String]) -> Result<Vec<&'a Pipeline>> {
    if selectors.is_empty() {
        return Ok(pipelines.iter().collect());
    }

    let available: Vec<String> = pipelines.iter().map(|p| p.id.clone()).collect();
    let mut wanted = vec![false; pipelines.len()];

    for selector in selectors {
        let selector = require_non_empty(selector, "pipeline", "Pipeline selector cannot be empty")?;

        let mut matched = false;
        for (idx, pipeline) in pipelines.iter().enumerate() {
            if pipeline.id == selector || glob_match(selector, &pipeline.id) {
                wanted[idx] = true;
                matched = true;
            }
        }

        if !matched {
            return Err(Error::pipeline_not_found(selector, available));
        }
    }

    Ok(pipelines
        .iter()
        .zip(wanted)
        .filter_map(|(p, keep)| keep.then_some(p))
        .collect())
}

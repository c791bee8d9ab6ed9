//! Checkpoint persistence for the global learner.
//!
//! A checkpoint is a numbered directory under the model directory,
//! holding the global parameters (`qnet.bin`), the target parameters
//! (`qnet_tgt.bin`) and, when present, the optimizer accumulator state
//! (`opt.bin`).
use crate::{opt::AdamState, util::SharedParams, Optimizer};
use anyhow::Result;
use log::info;
use ndarray::ArrayD;
use std::{
    fs,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

fn step_dir(dir: &Path, step: usize) -> PathBuf {
    dir.join(format!("{}", step))
}

fn numbered_dirs(dir: &Path) -> Result<Vec<usize>> {
    let mut steps = vec![];
    if !dir.exists() {
        return Ok(steps);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(step) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
            steps.push(step);
        }
    }
    Ok(steps)
}

fn write_tensors(path: &Path, tensors: &[ArrayD<f32>]) -> Result<()> {
    let file = fs::File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), tensors)?;
    Ok(())
}

fn read_tensors(path: &Path) -> Result<Vec<ArrayD<f32>>> {
    let file = fs::File::open(path)?;
    let tensors = bincode::deserialize_from(BufReader::new(file))?;
    Ok(tensors)
}

/// Saves the global parameters, target parameters and optimizer state
/// under `dir/<step>/`.
pub fn save(
    dir: impl AsRef<Path>,
    step: usize,
    params: &SharedParams,
    target: &SharedParams,
    optimizer: &Optimizer,
) -> Result<()> {
    let dir = step_dir(dir.as_ref(), step);
    fs::create_dir_all(&dir)?;
    write_tensors(&dir.join("qnet.bin"), &params.snapshot())?;
    write_tensors(&dir.join("qnet_tgt.bin"), &target.snapshot())?;
    if let Some(state) = optimizer.state() {
        let file = fs::File::create(dir.join("opt.bin"))?;
        bincode::serialize_into(BufWriter::new(file), &state)?;
    }
    info!("Saved checkpoint in {:?}", &dir);
    Ok(())
}

/// Restores the checkpoint at `dir/<step>/` into the given parameter sets
/// and optimizer.
pub fn load(
    dir: impl AsRef<Path>,
    step: usize,
    params: &SharedParams,
    target: &SharedParams,
    optimizer: &Optimizer,
) -> Result<()> {
    let dir = step_dir(dir.as_ref(), step);
    params.restore(&read_tensors(&dir.join("qnet.bin"))?);
    target.restore(&read_tensors(&dir.join("qnet_tgt.bin"))?);
    let opt_path = dir.join("opt.bin");
    if opt_path.exists() {
        let file = fs::File::open(opt_path)?;
        let state: Vec<AdamState> = bincode::deserialize_from(BufReader::new(file))?;
        optimizer.restore_state(state);
    }
    Ok(())
}

/// Returns the newest checkpoint step under `dir`, if any.
pub fn latest(dir: impl AsRef<Path>) -> Result<Option<usize>> {
    Ok(numbered_dirs(dir.as_ref())?.into_iter().max())
}

/// Deletes the oldest checkpoints, keeping at most `keep` of them.
pub fn prune(dir: impl AsRef<Path>, keep: usize) -> Result<()> {
    let mut steps = numbered_dirs(dir.as_ref())?;
    steps.sort_unstable_by(|a, b| b.cmp(a));
    for step in steps.into_iter().skip(keep) {
        fs::remove_dir_all(step_dir(dir.as_ref(), step))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest, load, prune, save};
    use crate::{util::SharedParams, OptimizerConfig};
    use ndarray::{ArrayD, IxDyn};
    use tempdir::TempDir;

    fn params(value: f32) -> SharedParams {
        SharedParams::new(vec![
            ArrayD::from_elem(IxDyn(&[2, 2]), value),
            ArrayD::from_elem(IxDyn(&[2]), -value),
        ])
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new("checkpoint").unwrap();
        let global = params(1.5);
        let target = params(0.5);
        let optimizer = OptimizerConfig::adam(0.01).build(&global);
        optimizer.apply(&global, &[
            ArrayD::from_elem(IxDyn(&[2, 2]), 1.0f32),
            ArrayD::from_elem(IxDyn(&[2]), 1.0f32),
        ]);
        save(dir.path(), 100, &global, &target, &optimizer).unwrap();

        let restored_global = params(0.0);
        let restored_target = params(0.0);
        let restored_opt = OptimizerConfig::adam(0.01).build(&restored_global);
        load(dir.path(), 100, &restored_global, &restored_target, &restored_opt).unwrap();
        assert_eq!(restored_global.snapshot(), global.snapshot());
        assert_eq!(restored_target.snapshot(), target.snapshot());
        assert!(restored_opt.state().is_some());
    }

    #[test]
    fn latest_and_prune() {
        let dir = TempDir::new("checkpoint").unwrap();
        assert_eq!(latest(dir.path()).unwrap(), None);

        let global = params(1.0);
        let target = params(1.0);
        let optimizer = OptimizerConfig::Sgd { lr: 0.1 }.build(&global);
        for step in [100, 300, 200] {
            save(dir.path(), step, &global, &target, &optimizer).unwrap();
        }
        assert_eq!(latest(dir.path()).unwrap(), Some(300));

        prune(dir.path(), 2).unwrap();
        assert_eq!(latest(dir.path()).unwrap(), Some(300));
        assert!(!dir.path().join("100").exists());
        assert!(dir.path().join("200").exists());
    }
}

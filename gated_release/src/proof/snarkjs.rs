//! Groth16 proofs through the `snarkjs` command line tool.
//!
//! The compiled policy circuit (`.wasm`), its proving key (`.zkey`) and the
//! exported verification key live in `work_dir`. The circuit takes
//! `attr{n}`, `key{n}_0`, `key{n}_1` for every requester wire `n` (1-based)
//! and `receiver`, and publishes the three signals described in `proof`.
//!
//! Witnesses, proofs and verifier inputs are written to a scratch directory
//! per call under `work_dir/runs`, so concurrent sessions sharing a
//! `work_dir` never see each other's files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{
    receiver_binding, PolicyWitness, Proof, ProofSystem, PublicSignals, VerificationKey,
    SIGNAL_OUTPUT,
};
use crate::error::ProofError;

static ANSI_ESCAPE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").ok());

const VERIFY_OK: &str = "snarkJS: OK";

const SCRATCH_DIR: &str = "runs";

static NEXT_RUN: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnarkjsConfig {
    /// The snarkjs executable.
    pub binary: String,
    pub work_dir: PathBuf,
    pub wasm: String,
    pub zkey: String,
    pub verification_key: String,
}

impl Default for SnarkjsConfig {
    fn default() -> Self {
        Self {
            binary: "snarkjs".to_string(),
            work_dir: PathBuf::from("ZK/circuit"),
            wasm: "commit_ped.wasm".to_string(),
            zkey: "commit_ped_0001.zkey".to_string(),
            verification_key: "verification_key.json".to_string(),
        }
    }
}

pub struct SnarkjsToolchain {
    config: SnarkjsConfig,
}

/// A directory owned by one prove or verify call, removed on drop.
struct Scratch {
    dir: PathBuf,
    /// `dir` relative to `work_dir`, for snarkjs arguments.
    rel: String,
}

impl Scratch {
    fn create(work_dir: &Path) -> Result<Self, ProofError> {
        let rel = format!(
            "{}/{}-{}",
            SCRATCH_DIR,
            std::process::id(),
            NEXT_RUN.fetch_add(1, Ordering::Relaxed)
        );
        let dir = work_dir.join(&rel);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, rel })
    }

    /// Argument form of `file` inside this directory.
    fn arg(&self, file: &str) -> String {
        format!("{}/{}", self.rel, file)
    }

    fn write_json(&self, file: &str, value: &Value) -> Result<(), ProofError> {
        fs::write(self.dir.join(file), serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T, ProofError> {
        read_json_file(&self.dir.join(file))
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            debug!(dir = %self.dir.display(), error = %e, "scratch directory left behind");
        }
    }
}

/// Drop terminal colour codes from snarkjs output.
pub fn strip_ansi(text: &str) -> String {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// The `input.json` object fed to `wtns calculate`.
pub fn witness_input(witness: &PolicyWitness) -> Value {
    let mut input = Map::new();
    for (i, (attr, pair)) in witness
        .attributes
        .iter()
        .zip(witness.labels.iter())
        .enumerate()
    {
        let n = i + 1;
        input.insert(format!("attr{n}"), Value::from(*attr as u8));
        input.insert(
            format!("key{n}_0"),
            Value::from(pair[0].key.to_u128().to_string()),
        );
        input.insert(
            format!("key{n}_1"),
            Value::from(pair[1].key.to_u128().to_string()),
        );
    }
    input.insert(
        "receiver".to_string(),
        Value::from(receiver_binding(&witness.receiver)),
    );
    Value::Object(input)
}

impl SnarkjsToolchain {
    pub fn new(config: SnarkjsConfig) -> Self {
        Self { config }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.config.work_dir.join(file)
    }

    fn run(&self, args: &[&str]) -> Result<Output, ProofError> {
        debug!(binary = %self.config.binary, ?args, "running snarkjs");
        let output = Command::new(&self.config.binary)
            .args(args)
            .current_dir(&self.config.work_dir)
            .output()?;
        Ok(output)
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output, ProofError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(ProofError::Toolchain {
                command: format!("{} {}", self.config.binary, args.join(" ")),
                status: output.status.to_string(),
                stderr: strip_ansi(&String::from_utf8_lossy(&output.stderr)),
            });
        }
        Ok(output)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T, ProofError> {
        read_json_file(&self.path(file))
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProofError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl ProofSystem for SnarkjsToolchain {
    fn prove(&self, witness: &PolicyWitness) -> Result<(Proof, PublicSignals), ProofError> {
        let scratch = Scratch::create(&self.config.work_dir)?;
        scratch.write_json("input.json", &witness_input(witness))?;
        let (input, wtns) = (scratch.arg("input.json"), scratch.arg("witness.wtns"));
        self.run_checked(&["wtns", "calculate", &self.config.wasm, &input, &wtns])?;
        let (proof, public) = (scratch.arg("proof.json"), scratch.arg("public.json"));
        self.run_checked(&["groth16", "prove", &self.config.zkey, &wtns, &proof, &public])?;

        let proof: Value = scratch.read_json("proof.json")?;
        let public: PublicSignals = scratch.read_json("public.json")?;
        Ok((Proof(proof), public))
    }

    fn verify(
        &self,
        proof: &Proof,
        public_signals: &PublicSignals,
        verification_key: &VerificationKey,
    ) -> Result<bool, ProofError> {
        // A valid proof of an unsatisfied policy still verifies in groth16.
        if public_signals.get(SIGNAL_OUTPUT).map(String::as_str) != Some("1") {
            return Ok(false);
        }
        let scratch = Scratch::create(&self.config.work_dir)?;
        scratch.write_json("verification_key.json", &verification_key.0)?;
        scratch.write_json("public.json", &serde_json::to_value(public_signals)?)?;
        scratch.write_json("proof.json", &proof.0)?;

        // snarkjs exits non-zero on an invalid proof, so only the output counts.
        let (vk, public, proof) = (
            scratch.arg("verification_key.json"),
            scratch.arg("public.json"),
            scratch.arg("proof.json"),
        );
        let output = self.run(&["groth16", "verify", &vk, &public, &proof])?;
        let stdout = strip_ansi(&String::from_utf8_lossy(&output.stdout));
        Ok(stdout.contains(VERIFY_OK))
    }

    fn verification_key(&self) -> Result<VerificationKey, ProofError> {
        Ok(VerificationKey(
            self.read_json(&self.config.verification_key)?,
        ))
    }
}

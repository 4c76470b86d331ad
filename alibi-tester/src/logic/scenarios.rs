//! Scenario catalog: each entry plays scripted sessions and checks the
//! session rules hold end to end.

use std::rc::Rc;
use std::time::{Duration, Instant};

use alibi_game::{
    Difficulty, GameMode, MemoryRoomStore, MemoryScenarioStore, Room, RoomStatus, RoomStore,
    decode_to_seed, generate_code_from_entropy, new_room_code,
};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use super::policy::AnswerPolicy;
use super::simulation::{CaseMetrics, SimConfig, run_case, run_case_in};

/// Outcome of one scenario across all seeds and iterations.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub average_duration: Duration,
    pub metrics: Vec<CaseMetrics>,
}

/// Names and descriptions of every scenario.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "one solo case end to end, invariants only"),
        ("full-case", "sharp play across all three difficulties"),
        (
            "timeout-pressure",
            "all-timeout play: maxed suspicion, zero strikes, no arrest",
        ),
        ("arrest-path", "deliberate critical miss ends in arrest"),
        (
            "archive-reuse",
            "admission control: reuse only with ten rated candidates",
        ),
        (
            "determinism",
            "same seed, same transcript; invite codes agree across ends",
        ),
    ]
}

/// Run one scenario. Returns `None` for an unknown name.
#[must_use]
pub fn run_scenario(
    name: &str,
    seeds: &[u64],
    iterations: usize,
    verbose: bool,
) -> Option<ScenarioResult> {
    let body: fn(u64) -> Result<Vec<CaseMetrics>, String> = match name {
        "smoke" => smoke,
        "full-case" => full_case,
        "timeout-pressure" => timeout_pressure,
        "arrest-path" => arrest_path,
        "archive-reuse" => archive_reuse,
        "determinism" => determinism,
        _ => return None,
    };

    let start = Instant::now();
    let mut failures = Vec::new();
    let mut successful = 0;
    let mut runs = 0;
    let mut metrics = Vec::new();

    for seed in seeds {
        for iteration in 0..iterations {
            runs += 1;
            let case_seed = seed.wrapping_add(iteration as u64).wrapping_mul(0x9E37_79B9);
            match body(case_seed) {
                Ok(batch) => {
                    successful += 1;
                    if verbose {
                        debug!("{name} seed {case_seed}: {} cases ok", batch.len());
                    }
                    metrics.extend(batch);
                }
                Err(message) => failures.push(format!("seed {case_seed}: {message}")),
            }
        }
    }

    let average_duration = start.elapsed().checked_div(runs.max(1) as u32).unwrap_or_default();
    Some(ScenarioResult {
        scenario_name: name.to_string(),
        passed: failures.is_empty(),
        iterations_run: runs,
        successful_iterations: successful,
        failures,
        average_duration,
        metrics,
    })
}

fn check(condition: bool, message: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

fn smoke(seed: u64) -> Result<Vec<CaseMetrics>, String> {
    let cfg = SimConfig::new(GameMode::Solo, Difficulty::Easy, seed, AnswerPolicy::Sharp);
    let metrics = run_case(&cfg).map_err(|e| format!("{e:#}"))?;
    check(
        metrics.final_suspicion.iter().all(|s| (0..=100).contains(s)),
        "suspicion out of range",
    )?;
    check(metrics.questions_scored >= 1, "no question was scored")?;
    check(
        metrics.winner == 1 || metrics.winner == 2,
        "winner is not a seat",
    )?;
    Ok(vec![metrics])
}

fn full_case(seed: u64) -> Result<Vec<CaseMetrics>, String> {
    let mut batch = Vec::new();
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        let cfg = SimConfig::new(GameMode::Local, difficulty, seed, AnswerPolicy::Sharp);
        let metrics = run_case(&cfg).map_err(|e| format!("{difficulty}: {e:#}"))?;
        check(
            metrics.dilemmas_resolved == difficulty.dilemma_count(),
            "dilemma count does not match the difficulty",
        )?;
        check(metrics.day_timeouts == 0, "sharp play timed out a dilemma")?;
        check(metrics.questions_scored == 10, "question set was not 10")?;
        check(metrics.verdict == "completed", "sharp play was arrested")?;
        check(
            metrics.final_suspicion.iter().all(|s| *s < 100),
            "perfect recall failed to lower suspicion",
        )?;
        batch.push(metrics);
    }
    Ok(batch)
}

fn timeout_pressure(seed: u64) -> Result<Vec<CaseMetrics>, String> {
    let cfg = SimConfig::new(GameMode::Local, Difficulty::Easy, seed, AnswerPolicy::Silent);
    let metrics = run_case(&cfg).map_err(|e| format!("{e:#}"))?;
    check(metrics.answer_timeouts == 10, "expected every answer to time out")?;
    check(
        metrics.final_suspicion == [100, 100],
        "timeout penalties must pin suspicion at the ceiling",
    )?;
    check(
        metrics.strikes == [0, 0],
        "timeouts must never add strikes",
    )?;
    // Maxed suspicion without a strike is not an arrest.
    check(metrics.verdict == "completed", "silent play must not arrest")?;
    Ok(vec![metrics])
}

fn arrest_path(seed: u64) -> Result<Vec<CaseMetrics>, String> {
    let cfg = SimConfig::new(GameMode::Local, Difficulty::Easy, seed, AnswerPolicy::Guilty);
    let metrics = run_case(&cfg).map_err(|e| format!("{e:#}"))?;
    check(metrics.verdict == "arrested", "guilty play must arrest")?;
    check(metrics.arrested == Some(1), "question zero targets seat one")?;
    check(
        metrics.questions_scored == 1,
        "arrest must cut the interrogation short",
    )?;
    Ok(vec![metrics])
}

fn archive_reuse(seed: u64) -> Result<Vec<CaseMetrics>, String> {
    // A thin archive must never serve reuse, whatever the draw.
    let thin = Rc::new(MemoryScenarioStore::new());
    for offset in 0..9u64 {
        let mut cfg = SimConfig::new(
            GameMode::Local,
            Difficulty::Easy,
            seed.wrapping_add(offset),
            AnswerPolicy::Sharp,
        );
        cfg.rate = Some(5);
        run_case_in(&cfg, &thin).map_err(|e| format!("stocking thin archive: {e:#}"))?;
    }
    check(thin.len() == 9, "thin archive should hold nine rows")?;
    for offset in 100..130u64 {
        let cfg = SimConfig::new(
            GameMode::Local,
            Difficulty::Easy,
            seed.wrapping_add(offset),
            AnswerPolicy::Sharp,
        );
        let metrics = run_case_in(&cfg, &thin).map_err(|e| format!("{e:#}"))?;
        check(
            !metrics.reused_scenario,
            "reuse served from below the candidate floor",
        )?;
    }

    // One more rated case clears the floor; reuse then shows up.
    let stocked = Rc::new(MemoryScenarioStore::new());
    let mut batch = Vec::new();
    for offset in 0..10u64 {
        let mut cfg = SimConfig::new(
            GameMode::Local,
            Difficulty::Easy,
            seed.wrapping_add(offset),
            AnswerPolicy::Sharp,
        );
        cfg.rate = Some(5);
        run_case_in(&cfg, &stocked).map_err(|e| format!("stocking archive: {e:#}"))?;
    }
    check(stocked.len() == 10, "archive should hold ten rows")?;

    let mut reused = 0;
    for offset in 100..130u64 {
        let cfg = SimConfig::new(
            GameMode::Local,
            Difficulty::Easy,
            seed.wrapping_add(offset),
            AnswerPolicy::Sharp,
        );
        let metrics = run_case_in(&cfg, &stocked).map_err(|e| format!("{e:#}"))?;
        if metrics.reused_scenario {
            reused += 1;
        }
        batch.push(metrics);
    }
    check(reused > 0, "a stocked archive never reused in thirty cases")?;
    Ok(batch)
}

fn determinism(seed: u64) -> Result<Vec<CaseMetrics>, String> {
    // Same seed, same case, twice over.
    let cfg = SimConfig::new(GameMode::Solo, Difficulty::Medium, seed, AnswerPolicy::Hesitant);
    let first = run_case(&cfg).map_err(|e| format!("{e:#}"))?;
    let second = run_case(&cfg).map_err(|e| format!("{e:#}"))?;
    check(first == second, "same seed produced different cases")?;

    // Both ends of an online table derive the same seed from one code.
    let code = generate_code_from_entropy(GameMode::Online, seed);
    let (mode_a, seed_a) =
        decode_to_seed(&code).ok_or_else(|| format!("invite code {code} failed to decode"))?;
    let (mode_b, seed_b) = decode_to_seed(&code.to_lowercase())
        .ok_or_else(|| format!("invite code {code} failed case-insensitive decode"))?;
    check(mode_a == GameMode::Online && mode_a == mode_b, "invite mode drifted")?;
    check(seed_a == seed_b, "invite seed drifted")?;

    let online = SimConfig::new(GameMode::Online, Difficulty::Easy, seed_a, AnswerPolicy::Sharp);
    let host = run_case(&online).map_err(|e| format!("{e:#}"))?;
    let guest = run_case(&online).map_err(|e| format!("{e:#}"))?;
    check(host == guest, "two ends of one table played different cases")?;

    // Lobby rows: joinable while waiting, gone once playing.
    let rooms = MemoryRoomStore::new();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let room_code = new_room_code(&mut rng);
    rooms
        .create(Room {
            code: room_code.clone(),
            difficulty: Difficulty::Easy,
            status: RoomStatus::Waiting,
        })
        .map_err(|e| format!("{e}"))?;
    check(
        rooms.join(&room_code).map_err(|e| format!("{e}"))?.is_some(),
        "waiting room was not joinable",
    )?;
    rooms
        .set_status(&room_code, RoomStatus::Playing)
        .map_err(|e| format!("{e}"))?;
    check(
        rooms.join(&room_code).map_err(|e| format!("{e}"))?.is_none(),
        "playing room must not be joinable",
    )?;

    Ok(vec![first, host])
}

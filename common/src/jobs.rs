//! How many transfers run at once.
//!
//! Precedence: explicit `--jobs` > `S3P_JOBS` > `2 × CPUs`. Whatever is chosen is clamped to
//! `[1, 10 × CPUs]`.

/// Environment variable supplying the default job count.
pub const JOBS_ENV_VAR: &str = "S3P_JOBS";

pub const MIN_JOBS: usize = 1;

fn cpus() -> usize {
    num_cpus::get()
}

/// `2 × cpus`, or 4 if the CPU count is unknown.
#[must_use]
pub fn default_jobs_for(cpus: usize) -> usize {
    if cpus == 0 { 4 } else { cpus * 2 }
}

/// `10 × cpus`, or 40 if the CPU count is unknown.
#[must_use]
pub fn max_jobs_for(cpus: usize) -> usize {
    if cpus == 0 { 40 } else { cpus * 10 }
}

#[must_use]
pub fn default_jobs() -> usize {
    default_jobs_for(cpus())
}

#[must_use]
pub fn max_jobs() -> usize {
    max_jobs_for(cpus())
}

/// Parse an override value. Absent or unparsable values yield 0 ("unset").
#[must_use]
pub fn parse_jobs(value: Option<&str>) -> usize {
    match value {
        None => 0,
        Some(value) if value.is_empty() => 0,
        Some(value) => value.trim().parse::<usize>().unwrap_or_else(|_| {
            tracing::warn!(
                "invalid {} value {:?}, using default",
                JOBS_ENV_VAR,
                value
            );
            0
        }),
    }
}

/// Read [`JOBS_ENV_VAR`]; 0 when unset or invalid.
#[must_use]
pub fn jobs_from_env() -> usize {
    parse_jobs(std::env::var(JOBS_ENV_VAR).ok().as_deref())
}

/// Clamp to `[MIN_JOBS, max]`. The message is set when clamping happened.
#[must_use]
pub fn clamp_jobs_to(jobs: usize, max: usize) -> (usize, Option<String>) {
    if jobs < MIN_JOBS {
        return (
            MIN_JOBS,
            Some(format!(
                "worker count {jobs} is below minimum {MIN_JOBS}, clamping to {MIN_JOBS}"
            )),
        );
    }
    if jobs > max {
        return (
            max,
            Some(format!(
                "worker count {jobs} exceeds maximum {max}, clamping to {max}"
            )),
        );
    }
    (jobs, None)
}

#[must_use]
pub fn clamp_jobs(jobs: usize) -> (usize, Option<String>) {
    clamp_jobs_to(jobs, max_jobs())
}

/// Apply the precedence rules for a given CPU count. A value of 0 means "not given".
#[must_use]
pub fn resolve_jobs_for(explicit: usize, env: usize, cpus: usize) -> (usize, Option<String>) {
    let jobs = if explicit > 0 {
        explicit
    } else if env > 0 {
        env
    } else {
        default_jobs_for(cpus)
    };
    clamp_jobs_to(jobs, max_jobs_for(cpus))
}

/// Effective job count for this process; logs a warning when the value had to be clamped.
#[must_use]
pub fn resolve_jobs(explicit: Option<usize>) -> usize {
    let (jobs, warning) = resolve_jobs_for(explicit.unwrap_or(0), jobs_from_env(), cpus());
    if let Some(warning) = warning {
        tracing::warn!("{}", warning);
    }
    tracing::debug!("using {} parallel jobs", jobs);
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scale_with_cpus() {
        assert_eq!(default_jobs_for(8), 16);
        assert_eq!(max_jobs_for(8), 80);
        assert_eq!(default_jobs_for(0), 4);
        assert_eq!(max_jobs_for(0), 40);
    }

    #[test]
    fn unset_explicit_and_env_fall_back_to_default() {
        assert_eq!(resolve_jobs_for(0, 0, 4), (8, None));
    }

    #[test]
    fn explicit_beats_env() {
        assert_eq!(resolve_jobs_for(3, 7, 4), (3, None));
        assert_eq!(resolve_jobs_for(0, 7, 4), (7, None));
    }

    #[test]
    fn explicit_above_max_is_clamped_with_warning() {
        let (jobs, warning) = resolve_jobs_for(1000, 0, 4);
        assert_eq!(jobs, 40);
        let warning = warning.unwrap();
        assert!(warning.contains("exceeds maximum 40"), "{warning}");
    }

    #[test]
    fn clamp_below_minimum() {
        let (jobs, warning) = clamp_jobs_to(0, 40);
        assert_eq!(jobs, MIN_JOBS);
        assert!(warning.unwrap().contains("below minimum"));
        assert_eq!(clamp_jobs_to(40, 40), (40, None));
    }

    #[test]
    fn env_parsing_is_lenient() {
        assert_eq!(parse_jobs(None), 0);
        assert_eq!(parse_jobs(Some("")), 0);
        assert_eq!(parse_jobs(Some("12")), 12);
        assert_eq!(parse_jobs(Some(" 6 ")), 6);
        assert_eq!(parse_jobs(Some("lots")), 0);
        assert_eq!(parse_jobs(Some("-3")), 0);
    }

    #[test]
    fn host_functions_agree_with_pure_ones() {
        let cpus = num_cpus::get();
        assert_eq!(default_jobs(), default_jobs_for(cpus));
        assert_eq!(max_jobs(), max_jobs_for(cpus));
        assert_eq!(clamp_jobs(1).0, 1);
    }
}

use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(cohort_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(base) = cohort_home {
        return Some(base.join(".env"));
    }
    Some(home_dir?.join(".cohort-lens/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("COHORT_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_prefers_cohort_home() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/srv/cohorts")),
            Some(PathBuf::from("/home/alice")),
        );

        assert_eq!(got, Some(PathBuf::from("/srv/cohorts/.env")));
    }

    #[test]
    fn fallback_uses_home_when_cohort_home_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        assert_eq!(got, Some(PathBuf::from("/home/alice/.cohort-lens/.env")));
    }

    #[test]
    fn fallback_is_none_without_any_base() {
        assert_eq!(fallback_dotenv_path(None, None), None);
    }
}

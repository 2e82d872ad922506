use crate::definition::CopyRule;
use crate::engine::error::CopyFailure;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Copies the files a rule selects below `from` into `to`, returning the written paths.
///
/// Anything inside one of `excludes` is never selected. Existing targets are overwritten.
pub async fn copy_matching(
    rule: &CopyRule,
    from: &Path,
    to: &Path,
    excludes: &[PathBuf],
) -> Result<Vec<PathBuf>, CopyFailure> {
    let base = from.join(&rule.src);
    let base = match tokio::fs::canonicalize(&base).await {
        Ok(base) => base,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(src = %base.display(), "copy source does not exist, nothing to copy");
            return Ok(vec![]);
        }
        Err(source) => {
            return Err(CopyFailure::Io {
                from: base,
                to: to.to_path_buf(),
                source,
            })
        }
    };

    let mut excluded = vec![];
    for path in excludes {
        if let Ok(path) = tokio::fs::canonicalize(path).await {
            excluded.push(path);
        }
    }

    let pattern = if rule.ignore_case {
        case_insensitive(&rule.pattern)
    } else {
        rule.pattern.clone()
    };

    let candidates = {
        let glob = wax::Glob::from_str(&pattern).map_err(|e| CopyFailure::Pattern {
            pattern: rule.pattern.clone(),
            message: e.to_string(),
        })?;

        let mut candidates = vec![];
        for item in glob.walk(&base) {
            match item {
                Err(e) => warn!(error = %e, "skipping unreadable entry"),
                Ok(item) => candidates.push(PathBuf::from(item.to_candidate_path().as_ref())),
            }
        }

        candidates
    };

    let dest = to.join(&rule.dst);
    let mut copied = vec![];

    for relative in candidates {
        let source = base.join(&relative);

        if excluded.iter().any(|x| source.starts_with(x)) {
            continue;
        }

        match tokio::fs::metadata(&source).await {
            Ok(md) if md.is_file() => {}
            _ => continue,
        }

        let target = if rule.keep_path {
            dest.join(&relative)
        } else {
            match relative.file_name() {
                Some(name) => dest.join(name),
                None => continue,
            }
        };

        copy_file(&source, &target).await?;
        copied.push(target);
    }

    debug!(pattern = %rule.pattern, count = copied.len(), "copied files");
    Ok(copied)
}

/// Adds the case-insensitive flag to a glob. wax only accepts the flag after any leading tree
/// wildcards, and a pattern made of tree wildcards alone has no case to ignore.
fn case_insensitive(pattern: &str) -> String {
    let mut rest = pattern;
    let mut prefix = String::new();

    while let Some(tail) = rest.strip_prefix("**/") {
        prefix.push_str("**/");
        rest = tail;
    }

    if rest.is_empty() || rest == "**" {
        return pattern.to_string();
    }

    format!("{}(?i){}", prefix, rest)
}

async fn copy_file(from: &Path, to: &Path) -> Result<(), CopyFailure> {
    let io_err = |source| CopyFailure::Io {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    tokio::fs::copy(from, to).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, relative).unwrap();
}

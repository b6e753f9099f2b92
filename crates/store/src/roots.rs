use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. The filesystem is not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// The root among `roots` that contains `path` most closely, with the
/// remaining relative part.
pub fn nearest_root<'a>(path: &Path, roots: &'a [PathBuf]) -> Option<(&'a Path, PathBuf)> {
    let path = normalize(path);
    roots
        .iter()
        .filter_map(|root| {
            let rel = path.strip_prefix(normalize(root)).ok()?;
            Some((root.as_path(), rel.to_path_buf()))
        })
        .min_by_key(|(_, rel)| rel.components().count())
}

/// Every root containing `path`, in configuration order.
pub fn containing_roots<'a>(
    path: &Path,
    roots: &'a [PathBuf],
) -> impl Iterator<Item = PathBuf> + 'a {
    let path = normalize(path);
    roots
        .iter()
        .filter_map(move |root| {
            path.strip_prefix(normalize(root))
                .ok()
                .map(Path::to_path_buf)
        })
}

/// `path` relative to `base`, climbing out of `base` with `..` where needed.
/// Both are compared lexically. `None` when they do not share an anchor
/// (root or drive) or `base` itself climbs.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    let path = normalize(path);
    let base = normalize(base);
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let anchor = |parts: &[Component<'_>]| {
        parts
            .iter()
            .take_while(|part| matches!(part, Component::Prefix(_) | Component::RootDir))
            .count()
    };
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common < anchor(&path_parts).max(anchor(&base_parts)) {
        return None;
    }
    if base_parts[common..]
        .iter()
        .any(|part| matches!(part, Component::ParentDir))
    {
        return None;
    }

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push(Component::ParentDir);
    }
    for part in &path_parts[common..] {
        rel.push(part);
    }
    Some(rel)
}

/// Render a relative path as a document key: `/` separators, no leading `/`.
pub fn to_key(rel: &Path) -> String {
    rel.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

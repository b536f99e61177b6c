fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }
    prev[b_len]
}

fn max_allowed_distance(input: &str) -> usize {
    match input.len() {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        n => (n as f32 * 0.35).floor().max(3.0) as usize,
    }
}

/// Closest candidates to `input` within an edit-distance budget scaled to
/// the input length, best first.
pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let input = input.trim().to_lowercase();
    if input.is_empty() || candidates.is_empty() {
        return Vec::new();
    }
    let allowed = max_allowed_distance(&input);

    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .filter_map(|candidate| {
            let score = levenshtein(&input, &candidate.to_lowercase());
            (score <= allowed).then_some((score, candidate))
        })
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .map(|(_, candidate)| candidate.clone())
        .take(limit.max(1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::suggest;

    #[test]
    fn suggests_close_names() {
        let candidates = vec![
            "proxmox_list_containers".to_string(),
            "proxmox_container_status".to_string(),
        ];
        let out = suggest("proxmox_list_container", &candidates, 3);
        assert_eq!(out.first().map(String::as_str), Some("proxmox_list_containers"));
    }

    #[test]
    fn ignores_distant_names() {
        let candidates = vec!["abc".to_string()];
        assert!(suggest("zzzzzzzz", &candidates, 3).is_empty());
    }
}

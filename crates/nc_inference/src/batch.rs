use nc_core::NarrativeMap;

/// Narratives per upstream call. One keeps each request short and a failure
/// cheap to redo.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Split `narratives` into consecutive batches of at most `batch_size`
/// entries, keeping iteration order. A size of zero is treated as one.
pub fn plan_batches(narratives: &NarrativeMap, batch_size: usize) -> Vec<NarrativeMap> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(narratives.len().div_ceil(batch_size));
    let mut current = NarrativeMap::with_capacity(batch_size);

    for (category, narrative) in narratives {
        current.insert(category.clone(), narrative.clone());
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, NarrativeMap::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_core::{Article, Narrative};
    use std::collections::HashSet;

    fn narratives(count: usize) -> NarrativeMap {
        (0..count)
            .map(|i| {
                let narrative = Narrative::new(vec![
                    Article::new(format!("Story {} part one", i), format!("https://a.test/{}", i), "cnn"),
                    Article::new(format!("Story {} part two", i), format!("https://b.test/{}", i), "fox"),
                ]);
                (format!("category_{}", i), narrative)
            })
            .collect()
    }

    #[test]
    fn test_seven_by_three() {
        let input = narratives(7);
        let batches = plan_batches(&input, 3);
        assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![3, 3, 1]);

        let flattened: Vec<&String> = batches.iter().flat_map(|b| b.keys()).collect();
        assert_eq!(flattened, input.keys().collect::<Vec<_>>());
        let unique: HashSet<&String> = flattened.iter().copied().collect();
        assert_eq!(unique.len(), input.len());
    }

    #[test]
    fn test_default_size_is_one_per_batch() {
        let batches = plan_batches(&narratives(4), DEFAULT_BATCH_SIZE);
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[2].keys().next().map(String::as_str), Some("category_2"));
    }

    #[test]
    fn test_edge_sizes() {
        assert!(plan_batches(&NarrativeMap::new(), 3).is_empty());
        assert_eq!(plan_batches(&narratives(2), 0).len(), 2);
        assert_eq!(plan_batches(&narratives(2), 10).len(), 1);
    }
}

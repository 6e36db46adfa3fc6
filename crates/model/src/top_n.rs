//! Selection of the most recent records per group, e.g. the last locations of
//! every bus.

use std::hash::Hash;

use indexmap::IndexMap;

/// Groups `records` by `group_of` and keeps, for every group in `groups`, the
/// `n` records with the highest `recency` key, most recent first.
///
/// Every requested group is present in the result, in request order, with an
/// empty vector if it has no records. Records of groups that were not
/// requested are dropped. The recency key should be unique per record (e.g.
/// `(timestamp, id)`) so that the output does not depend on input order.
pub fn top_n_per_group<G, R, K, FG, FK>(
    groups: &[G],
    records: impl IntoIterator<Item = R>,
    n: usize,
    group_of: FG,
    recency: FK,
) -> IndexMap<G, Vec<R>>
where
    G: Hash + Eq + Clone,
    K: Ord,
    FG: Fn(&R) -> G,
    FK: Fn(&R) -> K,
{
    let mut by_group: IndexMap<G, Vec<R>> = groups
        .iter()
        .map(|group| (group.clone(), Vec::new()))
        .collect();

    for record in records {
        if let Some(members) = by_group.get_mut(&group_of(&record)) {
            members.push(record);
        }
    }

    for members in by_group.values_mut() {
        members.sort_by(|a, b| recency(b).cmp(&recency(a)));
        members.truncate(n);
    }

    by_group
}

#[cfg(test)]
mod tests {
    use super::top_n_per_group;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping {
        id: i64,
        bus: i64,
        timestamp: i64,
    }

    fn ping(id: i64, bus: i64, timestamp: i64) -> Ping {
        Ping { id, bus, timestamp }
    }

    fn select(groups: &[i64], pings: Vec<Ping>, n: usize) -> Vec<(i64, Vec<i64>)> {
        top_n_per_group(groups, pings, n, |p| p.bus, |p| (p.timestamp, p.id))
            .into_iter()
            .map(|(bus, pings)| (bus, pings.into_iter().map(|p| p.id).collect()))
            .collect()
    }

    #[test]
    fn keeps_n_most_recent_per_group() {
        let pings = vec![
            ping(1, 10, 100),
            ping(2, 10, 300),
            ping(3, 20, 200),
            ping(4, 10, 200),
            ping(5, 10, 50),
        ];
        assert_eq!(
            select(&[10, 20], pings, 2),
            vec![(10, vec![2, 4]), (20, vec![3])]
        );
    }

    #[test]
    fn output_is_non_increasing_in_time() {
        let pings = (0..50).map(|i| ping(i, i % 3, (i * 37) % 11)).collect::<Vec<_>>();
        let result = top_n_per_group(&[0, 1, 2], pings, 5, |p| p.bus, |p| (p.timestamp, p.id));
        for members in result.values() {
            assert_eq!(members.len(), 5);
            assert!(members.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        }
    }

    #[test]
    fn empty_groups_map_to_empty_lists() {
        let pings = vec![ping(1, 10, 100)];
        assert_eq!(
            select(&[30, 10], pings, 10),
            vec![(30, vec![]), (10, vec![1])]
        );
    }

    #[test]
    fn no_groups_no_result() {
        assert!(select(&[], vec![ping(1, 10, 100)], 10).is_empty());
    }

    #[test]
    fn single_group_behaves_like_many() {
        let pings = vec![ping(1, 10, 100), ping(2, 11, 100), ping(3, 10, 90)];
        assert_eq!(select(&[10], pings, 10), vec![(10, vec![1, 3])]);
    }

    #[test]
    fn equal_timestamps_prefer_later_insertions() {
        let pings = vec![ping(1, 10, 100), ping(2, 10, 100), ping(3, 10, 100)];
        assert_eq!(select(&[10], pings, 2), vec![(10, vec![3, 2])]);
    }
}

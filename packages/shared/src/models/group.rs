use serde::{Deserialize, Serialize};

/// An isolated matchmaking namespace: the sorted, de-duplicated usernames of
/// its members. Member order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group(Vec<String>);

impl Group {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members: Vec<String> = members.into_iter().map(Into::into).collect();
        members.sort();
        members.dedup();
        Group(members)
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_member_order_is_irrelevant() {
        let a = Group::new(["carol", "alice", "bob"]);
        let b = Group::new(vec!["bob".to_string(), "carol".to_string(), "alice".to_string()]);

        assert_eq!(a, b);
        assert_eq!(a.members(), &["alice", "bob", "carol"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let group = Group::new(["alice", "alice", "bob"]);
        assert_eq!(group.members(), &["alice", "bob"]);
    }

    proptest! {
        #[test]
        fn test_any_permutation_gives_the_same_group(
            members in prop::collection::vec("[a-z]{1,8}", 1..6),
            seed in any::<u64>(),
        ) {
            let mut shuffled = members.clone();
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();

            prop_assert_eq!(Group::new(members), Group::new(shuffled));
        }
    }
}

//! In-memory projection tables.
//!
//! Inserts never overwrite: a second insert under an existing key is a
//! no-op, which is what makes replaying a block range harmless. Updates
//! require the row to exist and report whether anything changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{pool_prefix, Cycle, CycleContribution, Member, Pool};

/// Projection table names, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Pools,
    Members,
    Cycles,
    CycleContributions,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Table::Pools => "pools",
            Table::Members => "members",
            Table::Cycles => "cycles",
            Table::CycleContributions => "cycle_contributions",
        };
        f.write_str(name)
    }
}

/// Result of a write against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    /// Key already present, or update produced an identical row
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Update targeted a row that was never inserted
    MissingRow { table: Table, key: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::MissingRow { table, key } => {
                write!(f, "No row '{}' in table {}", key, table)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Row counts across all tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionStats {
    pub pools: usize,
    pub members: usize,
    pub cycles: usize,
    pub cycle_contributions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionStore {
    pools: BTreeMap<String, Pool>,
    members: BTreeMap<String, Member>,
    cycles: BTreeMap<String, Cycle>,
    cycle_contributions: BTreeMap<String, CycleContribution>,
}

fn insert_if_absent<T>(table: &mut BTreeMap<String, T>, key: &str, row: T) -> WriteOutcome {
    if table.contains_key(key) {
        return WriteOutcome::Unchanged;
    }
    table.insert(key.to_string(), row);
    WriteOutcome::Inserted
}

fn update_existing<T, F>(
    table: &mut BTreeMap<String, T>,
    name: Table,
    key: &str,
    apply: F,
) -> Result<WriteOutcome, StoreError>
where
    T: Clone + PartialEq,
    F: FnOnce(&mut T),
{
    let row = table.get_mut(key).ok_or_else(|| StoreError::MissingRow {
        table: name,
        key: key.to_string(),
    })?;
    let before = row.clone();
    apply(row);
    if *row == before {
        Ok(WriteOutcome::Unchanged)
    } else {
        Ok(WriteOutcome::Updated)
    }
}

fn rows_with_prefix<'a, 'p, T>(
    table: &'a BTreeMap<String, T>,
    prefix: &'p str,
) -> impl Iterator<Item = &'a T> + 'p
where
    'a: 'p,
{
    table
        .range(prefix.to_string()..)
        .take_while(move |(key, _)| key.starts_with(prefix))
        .map(|(_, row)| row)
}

impl ProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pool(&mut self, pool: Pool) -> WriteOutcome {
        let key = pool.id.clone();
        insert_if_absent(&mut self.pools, &key, pool)
    }

    pub fn insert_member(&mut self, member: Member) -> WriteOutcome {
        let key = member.id.clone();
        insert_if_absent(&mut self.members, &key, member)
    }

    pub fn insert_cycle(&mut self, cycle: Cycle) -> WriteOutcome {
        let key = cycle.id.clone();
        insert_if_absent(&mut self.cycles, &key, cycle)
    }

    pub fn insert_contribution(&mut self, contribution: CycleContribution) -> WriteOutcome {
        let key = contribution.id.clone();
        insert_if_absent(&mut self.cycle_contributions, &key, contribution)
    }

    pub fn update_pool<F>(&mut self, key: &str, apply: F) -> Result<WriteOutcome, StoreError>
    where
        F: FnOnce(&mut Pool),
    {
        update_existing(&mut self.pools, Table::Pools, key, apply)
    }

    pub fn update_cycle<F>(&mut self, key: &str, apply: F) -> Result<WriteOutcome, StoreError>
    where
        F: FnOnce(&mut Cycle),
    {
        update_existing(&mut self.cycles, Table::Cycles, key, apply)
    }

    pub fn pool(&self, key: &str) -> Option<&Pool> {
        self.pools.get(key)
    }

    pub fn member(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    pub fn cycle(&self, key: &str) -> Option<&Cycle> {
        self.cycles.get(key)
    }

    pub fn contribution(&self, key: &str) -> Option<&CycleContribution> {
        self.cycle_contributions.get(key)
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    pub fn members_of(&self, pool: &str) -> Vec<&Member> {
        let prefix = pool_prefix(pool);
        rows_with_prefix(&self.members, &prefix).collect()
    }

    pub fn member_count(&self, pool: &str) -> usize {
        let prefix = pool_prefix(pool);
        rows_with_prefix(&self.members, &prefix).count()
    }

    /// Cycles of a pool ordered by cycle index.
    pub fn cycles_of(&self, pool: &str) -> Vec<&Cycle> {
        let prefix = pool_prefix(pool);
        let mut cycles: Vec<&Cycle> = rows_with_prefix(&self.cycles, &prefix).collect();
        cycles.sort_by_key(|c| c.index);
        cycles
    }

    /// Contributions of a pool, optionally restricted to one cycle.
    pub fn contributions_of(&self, pool: &str, cycle: Option<u64>) -> Vec<&CycleContribution> {
        let prefix = match cycle {
            Some(index) => format!("{}{}{}", pool_prefix(pool), index, super::types::KEY_SEPARATOR),
            None => pool_prefix(pool),
        };
        let mut rows: Vec<&CycleContribution> =
            rows_with_prefix(&self.cycle_contributions, &prefix).collect();
        rows.sort_by(|a, b| {
            a.cycle_index
                .cmp(&b.cycle_index)
                .then_with(|| a.member_address.cmp(&b.member_address))
        });
        rows
    }

    pub fn stats(&self) -> ProjectionStats {
        ProjectionStats {
            pools: self.pools.len(),
            members: self.members.len(),
            cycles: self.cycles.len(),
            cycle_contributions: self.cycle_contributions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::types::{address_key, contribution_key, cycle_key, member_key, PoolState};
    use alloy_primitives::{Address, U256};

    fn pool_row(pool: &Address) -> Pool {
        Pool {
            id: address_key(pool),
            creator: address_key(&Address::repeat_byte(0xcc)),
            name: "Friends".into(),
            description: "Monthly savings".into(),
            max_members: 3,
            contribution_per_period: U256::from(100u64),
            period_duration: 86_400,
            yield_bonus_split: 50,
            state: PoolState::Open,
            current_cycle: 0,
            total_cycles: 0,
            cycle_start_time: 0,
            created_at_block: 10,
            created_at_timestamp: 1_000,
        }
    }

    fn member_row(pool: &Address, member: &Address) -> Member {
        Member {
            id: member_key(pool, member),
            pool_id: address_key(pool),
            address: address_key(member),
            contribution: U256::from(300u64),
            joined_at_block: 11,
            joined_at_timestamp: 1_010,
        }
    }

    fn contribution_row(pool: &Address, cycle: u64, member: &Address) -> CycleContribution {
        CycleContribution {
            id: contribution_key(pool, cycle, member),
            pool_id: address_key(pool),
            cycle_index: cycle,
            member_address: address_key(member),
            amount: U256::from(100u64),
            is_liquidated: false,
            timestamp: 2_000,
        }
    }

    #[test]
    fn test_insert_is_first_writer_wins() {
        let pool = Address::repeat_byte(0x01);
        let mut store = ProjectionStore::new();

        assert_eq!(store.insert_pool(pool_row(&pool)), WriteOutcome::Inserted);

        let mut renamed = pool_row(&pool);
        renamed.name = "Other".into();
        assert_eq!(store.insert_pool(renamed), WriteOutcome::Unchanged);
        assert_eq!(store.pool(&address_key(&pool)).unwrap().name, "Friends");
    }

    #[test]
    fn test_update_missing_row_is_error() {
        let mut store = ProjectionStore::new();
        let err = store
            .update_cycle("0xdead|0", |c| c.prize = U256::from(1u64))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::MissingRow {
                table: Table::Cycles,
                key: "0xdead|0".into()
            }
        );
    }

    #[test]
    fn test_update_reports_unchanged_for_identical_row() {
        let pool = Address::repeat_byte(0x01);
        let key = address_key(&pool);
        let mut store = ProjectionStore::new();
        store.insert_pool(pool_row(&pool));

        let first = store.update_pool(&key, |p| p.state = PoolState::Active).unwrap();
        let second = store.update_pool(&key, |p| p.state = PoolState::Active).unwrap();

        assert_eq!(first, WriteOutcome::Updated);
        assert_eq!(second, WriteOutcome::Unchanged);
    }

    #[test]
    fn test_child_queries_do_not_leak_across_pools() {
        let pool_a = Address::repeat_byte(0x01);
        let pool_b = Address::repeat_byte(0x02);
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);

        let mut store = ProjectionStore::new();
        store.insert_pool(pool_row(&pool_a));
        store.insert_pool(pool_row(&pool_b));
        store.insert_member(member_row(&pool_a, &alice));
        store.insert_member(member_row(&pool_a, &bob));
        store.insert_member(member_row(&pool_b, &alice));

        assert_eq!(store.member_count(&address_key(&pool_a)), 2);
        assert_eq!(store.member_count(&address_key(&pool_b)), 1);
        assert_eq!(store.members_of(&address_key(&pool_b))[0].address, address_key(&alice));
    }

    #[test]
    fn test_contributions_filtered_by_cycle() {
        let pool = Address::repeat_byte(0x01);
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        let key = address_key(&pool);

        let mut store = ProjectionStore::new();
        store.insert_contribution(contribution_row(&pool, 0, &alice));
        store.insert_contribution(contribution_row(&pool, 0, &bob));
        store.insert_contribution(contribution_row(&pool, 1, &alice));
        // cycle 10 shares the "1" digit prefix with cycle 1
        store.insert_contribution(contribution_row(&pool, 10, &alice));

        assert_eq!(store.contributions_of(&key, None).len(), 4);
        assert_eq!(store.contributions_of(&key, Some(0)).len(), 2);
        assert_eq!(store.contributions_of(&key, Some(1)).len(), 1);
        assert_eq!(store.contributions_of(&key, Some(10)).len(), 1);
    }

    #[test]
    fn test_cycles_sorted_numerically() {
        let pool = Address::repeat_byte(0x01);
        let winner = Address::repeat_byte(0xa1);
        let mut store = ProjectionStore::new();
        for index in [10u64, 2, 0] {
            store.insert_cycle(Cycle {
                id: cycle_key(&pool, index),
                pool_id: address_key(&pool),
                index,
                winner: address_key(&winner),
                prize: U256::ZERO,
                yield_bonus: U256::ZERO,
                compounded: U256::ZERO,
                timestamp: 0,
            });
        }

        let indices: Vec<u64> = store.cycles_of(&address_key(&pool)).iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 2, 10]);
        assert_eq!(store.stats().cycles, 3);
    }
}

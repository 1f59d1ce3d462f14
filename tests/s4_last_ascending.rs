// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! S4 (spec.md §8): `last(v)` under an ascending query, driven through
//! `ScanEngine` rather than by hand-feeding `FirstLastAgg`/`ScanState`
//! directly. `FirstLastAgg`'s take/keep comparison is order-independent,
//! so the master pass alone must already produce the right answer, and
//! the orchestrator's supplementary bookkeeping (`scanner::ScanState`)
//! must not perturb it.

use test_log::test;
use vnode_query_engine::agg::Value;
use vnode_query_engine::descriptor::CompBlock;
use vnode_query_engine::engine::{AggKind, BlockSource, OutputColumn, QuerySpec, ScanEngine, WindowSpec};
use vnode_query_engine::interp::InterpType;
use vnode_query_engine::locator::Order;
use vnode_query_engine::query::Query;
use vnode_query_engine::schema::ColumnType;

struct OneBlock {
    block: CompBlock,
    timestamps: Vec<i64>,
    values: Vec<Value>,
}

impl OneBlock {
    fn new(rows: &[(i64, f64)]) -> Self {
        let timestamps: Vec<i64> = rows.iter().map(|(ts, _)| *ts).collect();
        let values: Vec<Value> = rows.iter().map(|(_, v)| Value::Float(*v)).collect();
        let block = CompBlock {
            key_first: *timestamps.first().unwrap(),
            key_last: *timestamps.last().unwrap(),
            num_of_points: timestamps.len() as u32,
            num_of_cols: 2,
            offset: 0,
            payload_len: 0,
            algorithm: vnode_query_engine::compression::CompressionType::None,
            last: false,
            col_pre_agg: vec![],
        };
        Self { block, timestamps, values }
    }
}

impl BlockSource for OneBlock {
    fn blocks(&self) -> &[CompBlock] {
        std::slice::from_ref(&self.block)
    }
    fn load_timestamps(&mut self, _block_idx: usize) -> vnode_query_engine::Result<Vec<i64>> {
        Ok(self.timestamps.clone())
    }
    fn load_values(&mut self, _block_idx: usize, _physical_idx: usize) -> vnode_query_engine::Result<Vec<Value>> {
        Ok(self.values.clone())
    }
}

#[test]
fn last_of_ascending_query_comes_out_of_the_orchestrated_scan() {
    let rows = [(1i64, 10.0), (2, 20.0), (3, 30.0)];
    let mut source = OneBlock::new(&rows);

    let mut query = Query::new(Order::Ascending, 1, 3);
    let spec = QuerySpec {
        requested_columns: vec![1],
        requested_types: vec![ColumnType::Double],
        filters: vec![],
        outputs: vec![OutputColumn { kind: AggKind::Last, requested_idx: Some(0) }],
        window: WindowSpec::None,
        interp_type: InterpType::None,
        default_value: None,
        closed_spill_threshold: 0,
    };

    let mut engine = ScanEngine::prepare(&mut query, &spec, &mut source, None).expect("scan succeeds");
    let out = engine.fetch(&mut query, 10);

    assert_eq!(out, vec![vec![Value::Float(30.0)]]);
}

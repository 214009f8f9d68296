#![allow(dead_code)]

use std::collections::HashMap;

use gridcalc_engine::{
    CellAddr, DataHost, Engine, EngineError, EngineOptions, Position, Reference, SheetId, Value,
};

/// An in-memory grid the engine reads through: sheets by name, sparse
/// cells, named variables.
#[derive(Default)]
pub struct GridHost {
    sheets: Vec<String>,
    cells: HashMap<(SheetId, CellAddr), Value>,
    variables: HashMap<String, Reference>,
}

impl GridHost {
    pub fn new() -> Self {
        Self {
            sheets: vec!["Sheet1".to_string()],
            ..Self::default()
        }
    }

    /// Id of `name`, adding the sheet when it is new.
    pub fn sheet(&mut self, name: &str) -> SheetId {
        if let Some(id) = self
            .sheets
            .iter()
            .position(|s| s.eq_ignore_ascii_case(name))
        {
            return id;
        }
        self.sheets.push(name.to_string());
        self.sheets.len() - 1
    }

    pub fn set(&mut self, addr: &str, value: impl Into<Value>) {
        self.set_on(0, addr, value);
    }

    pub fn set_on(&mut self, sheet: SheetId, addr: &str, value: impl Into<Value>) {
        let addr = CellAddr::from_a1(addr).expect("cell address");
        self.cells.insert((sheet, addr), value.into());
    }

    /// Bind a variable; lookups are case-insensitive, like sheet names.
    pub fn define(&mut self, name: &str, reference: Reference) {
        self.variables.insert(name.to_ascii_uppercase(), reference);
    }
}

impl DataHost for GridHost {
    fn cell_value(&self, sheet: SheetId, addr: CellAddr) -> Value {
        self.cells
            .get(&(sheet, addr))
            .cloned()
            .unwrap_or(Value::Blank)
    }

    fn variable_ref(&self, name: &str, _sheet: SheetId) -> Option<Reference> {
        self.variables.get(&name.to_ascii_uppercase()).cloned()
    }

    fn sheet_id(&self, name: &str) -> Option<SheetId> {
        self.sheets
            .iter()
            .position(|s| s.eq_ignore_ascii_case(name))
    }
}

/// One engine over a [`GridHost`], evaluating at A1 of the first sheet
/// unless told otherwise.
pub struct TestGrid {
    engine: Engine<GridHost>,
}

impl TestGrid {
    pub fn new(host: GridHost) -> Self {
        Self {
            engine: Engine::new(host),
        }
    }

    pub fn empty() -> Self {
        Self::new(GridHost::new())
    }

    pub fn with_options(host: GridHost, options: EngineOptions) -> Self {
        Self {
            engine: Engine::with_options(host, options).expect("engine options"),
        }
    }

    pub fn engine(&self) -> &Engine<GridHost> {
        &self.engine
    }

    pub fn eval(&self, formula: &str) -> Value {
        self.eval_at(formula, Position::new(0, 0, 0))
    }

    pub fn eval_at(&self, formula: &str, position: Position) -> Value {
        self.engine
            .evaluate(formula, position, false)
            .expect("scalar evaluation")
    }

    /// Evaluate with the array-result policy enabled.
    pub fn eval_array(&self, formula: &str) -> Value {
        self.engine
            .evaluate(formula, Position::new(0, 0, 0), true)
            .expect("array evaluation")
    }

    pub fn try_eval(&self, formula: &str) -> Result<Value, EngineError> {
        self.engine.evaluate(formula, Position::new(0, 0, 0), false)
    }
}

pub fn assert_number(value: &Value, expected: f64) {
    match value {
        Value::Number(n) => {
            assert!((*n - expected).abs() < 1e-9, "expected {expected}, got {n}");
        }
        other => panic!("expected number {expected}, got {other:?}"),
    }
}

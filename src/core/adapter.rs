//! Query adapter between the launcher and a calculation engine.
//!
//! One mutex guards the engine handle together with its evaluation and print
//! options. Every query holds it from submission until its result item is
//! built, and every setting change takes it, so a change never affects the
//! calculation in flight.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::config::Settings;
use crate::core::item::{Action, RankItem, ResultItem};
use crate::core::query::Query;
use crate::engine::{AngleUnit, Calculator, EvaluationOptions, MathStructure, ParsingMode, PrintOptions};

pub const ICON: &str = "accessories-calculator";
pub const DOCUMENTATION_URL: &str = "https://qalculate.github.io/manual/index.html";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

const RESULT_ID: &str = "qalc-res";
const ERROR_ID: &str = "qalc-err";
/// Score of results in global queries
const GLOBAL_SCORE: f32 = 1.0;

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(MathStructure),
    /// Engine messages in the order they were recorded
    Diagnostics(Vec<String>),
}

struct State<C> {
    calculator: C,
    eo: EvaluationOptions,
    po: PrintOptions,
}

pub struct QueryAdapter<C: Calculator> {
    state: Mutex<State<C>>,
    poll_interval: Duration,
}

impl<C: Calculator> QueryAdapter<C> {
    pub fn new(mut calculator: C, settings: &Settings) -> Self {
        calculator.set_precision(settings.precision);

        let mut eo = EvaluationOptions::default();
        eo.parse_options.angle_unit = settings.angle_unit;
        eo.parse_options.parsing_mode = settings.parsing_mode;
        eo.parse_options.functions_enabled = settings.functions_in_global_query;
        eo.parse_options.units_enabled = settings.units_in_global_query;
        eo.parse_options.unknowns_enabled = false;

        let po = PrintOptions {
            indicate_infinite_series: true,
            lower_case_e: true,
            use_unicode_signs: true,
            ..PrintOptions::default()
        };

        Self {
            state: Mutex::new(State { calculator, eo, po }),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How often a running calculation is checked for completion and
    /// cancellation
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The state stays consistent between calls, so a poisoned lock is
    /// still usable
    fn lock(&self) -> MutexGuard<'_, State<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opportunistic query: failures are silent
    pub fn handle_global_query(&self, query: &Query) -> Vec<RankItem> {
        let text = query.string().trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut state = self.lock();
        let eo = state.eo.clone();
        let outcome = self.evaluate(&mut state, text, &eo, || query.is_valid());

        if !query.is_valid() {
            return Vec::new();
        }

        match outcome {
            Outcome::Success(result) => {
                vec![RankItem::new(build_item(&state.po, text, result), GLOBAL_SCORE)]
            }
            Outcome::Diagnostics(messages) => {
                tracing::trace!("Global query {:?} not a calculation: {:?}", text, messages);
                Vec::new()
            }
        }
    }

    /// Query addressed to the calculator: failures become an error item
    pub fn handle_trigger_query(&self, query: &Query) -> Vec<ResultItem> {
        let text = query.string().trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut state = self.lock();
        let eo = state.eo.with_everything_enabled();
        let outcome = self.evaluate(&mut state, text, &eo, || query.is_valid());

        if !query.is_valid() {
            return Vec::new();
        }

        match outcome {
            Outcome::Success(result) => vec![build_item(&state.po, text, result)],
            Outcome::Diagnostics(messages) => vec![error_item(&messages)],
        }
    }

    /// Evaluate `text` outside of a query
    ///
    /// `full` enables functions, units and unknowns regardless of the
    /// global query settings.
    pub fn evaluate_text(&self, text: &str, full: bool, is_valid: impl Fn() -> bool) -> Outcome {
        let mut state = self.lock();
        let eo = if full {
            state.eo.with_everything_enabled()
        } else {
            state.eo.clone()
        };
        self.evaluate(&mut state, text, &eo, is_valid)
    }

    /// Run one calculation to completion, polling for cancellation
    fn evaluate(
        &self,
        state: &mut State<C>,
        text: &str,
        eo: &EvaluationOptions,
        is_valid: impl Fn() -> bool,
    ) -> Outcome {
        let calculator = &mut state.calculator;
        let expression = calculator.unlocalize_expression(text, &eo.parse_options);

        calculator.start_control();
        calculator.calculate(&expression, eo);

        let mut aborted = false;
        while calculator.busy() {
            if !aborted && !is_valid() {
                tracing::debug!("Query {:?} invalidated, aborting calculation", text);
                calculator.abort();
                aborted = true;
            }
            thread::sleep(self.poll_interval);
        }

        calculator.stop_control();

        let messages = calculator.take_messages();
        if !messages.is_empty() {
            return Outcome::Diagnostics(messages.into_iter().map(|m| m.text).collect());
        }

        match calculator.take_result() {
            Some(result) => Outcome::Success(result),
            None => Outcome::Diagnostics(vec!["Calculation produced no result.".to_string()]),
        }
    }

    pub fn precision(&self) -> u32 {
        self.lock().calculator.precision()
    }

    pub fn set_precision(&self, precision: u32) {
        self.lock().calculator.set_precision(precision);
    }

    pub fn angle_unit(&self) -> AngleUnit {
        self.lock().eo.parse_options.angle_unit
    }

    pub fn set_angle_unit(&self, angle_unit: AngleUnit) {
        self.lock().eo.parse_options.angle_unit = angle_unit;
    }

    pub fn parsing_mode(&self) -> ParsingMode {
        self.lock().eo.parse_options.parsing_mode
    }

    pub fn set_parsing_mode(&self, parsing_mode: ParsingMode) {
        self.lock().eo.parse_options.parsing_mode = parsing_mode;
    }

    pub fn units_in_global_query(&self) -> bool {
        self.lock().eo.parse_options.units_enabled
    }

    pub fn set_units_in_global_query(&self, enabled: bool) {
        self.lock().eo.parse_options.units_enabled = enabled;
    }

    pub fn functions_in_global_query(&self) -> bool {
        self.lock().eo.parse_options.functions_enabled
    }

    pub fn set_functions_in_global_query(&self, enabled: bool) {
        self.lock().eo.parse_options.functions_enabled = enabled;
    }

    /// The live configuration as settings
    pub fn settings(&self) -> Settings {
        let state = self.lock();
        let parse = &state.eo.parse_options;
        Settings {
            angle_unit: parse.angle_unit,
            parsing_mode: parse.parsing_mode,
            precision: state.calculator.precision(),
            units_in_global_query: parse.units_enabled,
            functions_in_global_query: parse.functions_enabled,
        }
    }
}

/// Result item for a successful calculation
///
/// The copy actions capture the printed result at construction time.
pub fn build_item(po: &PrintOptions, query: &str, mut result: MathStructure) -> ResultItem {
    result.format(po);
    let printed = result.print(po);

    let subtext = if result.is_approximate() {
        format!("Approximate result of {}", query)
    } else {
        format!("Result of {}", query)
    };

    ResultItem {
        id: RESULT_ID.to_string(),
        subtext,
        icon: ICON.to_string(),
        actions: vec![
            Action::copy("cpr", "Copy result to clipboard", printed.clone()),
            Action::copy(
                "cpe",
                "Copy equation to clipboard",
                format!("{} = {}", query, printed),
            ),
        ],
        text: printed,
    }
}

fn error_item(messages: &[String]) -> ResultItem {
    ResultItem {
        id: ERROR_ID.to_string(),
        text: "Evaluation error.".to_string(),
        subtext: messages.join(", "),
        icon: ICON.to_string(),
        actions: vec![Action::open_url(
            "manual",
            "Visit documentation",
            DOCUMENTATION_URL,
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::ActionKind;
    use crate::engine::{BuiltinCalculator, Message, Number, ParseOptions, Value};
    use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn builtin(settings: &Settings) -> QueryAdapter<BuiltinCalculator> {
        QueryAdapter::new(BuiltinCalculator::with_data_dir(None), settings)
            .with_poll_interval(Duration::from_millis(1))
    }

    /// What the scripted engine saw, shared with the test
    #[derive(Default)]
    struct Probe {
        calculations: AtomicUsize,
        started: AtomicBool,
        release: AtomicBool,
        aborted: AtomicBool,
        precision_at_calculate: AtomicU32,
    }

    /// Engine that stays busy until released or aborted
    struct Scripted {
        probe: Arc<Probe>,
        precision: u32,
        outcome: Result<Number, Vec<String>>,
        running: bool,
        result: Option<MathStructure>,
        messages: Vec<Message>,
    }

    impl Scripted {
        fn new(outcome: Result<Number, Vec<String>>) -> (Self, Arc<Probe>) {
            let probe = Arc::new(Probe::default());
            let calculator = Self {
                probe: Arc::clone(&probe),
                precision: 16,
                outcome,
                running: false,
                result: None,
                messages: Vec::new(),
            };
            (calculator, probe)
        }
    }

    impl Calculator for Scripted {
        fn precision(&self) -> u32 {
            self.precision
        }

        fn set_precision(&mut self, precision: u32) {
            self.precision = precision;
        }

        fn unlocalize_expression(&self, expression: &str, _: &ParseOptions) -> String {
            expression.to_string()
        }

        fn start_control(&mut self) {
            self.probe.aborted.store(false, Ordering::SeqCst);
        }

        fn stop_control(&mut self) {
            self.running = false;
            if self.probe.aborted.load(Ordering::SeqCst) {
                self.messages.push(Message::error("Calculation was aborted."));
                return;
            }
            match &self.outcome {
                Ok(number) => {
                    self.result = Some(MathStructure::new(
                        Value::scalar(number.clone()),
                        self.probe.precision_at_calculate.load(Ordering::SeqCst),
                    ))
                }
                Err(messages) => self
                    .messages
                    .extend(messages.iter().map(|m| Message::error(m.as_str()))),
            }
        }

        fn calculate(&mut self, _: &str, _: &EvaluationOptions) {
            self.probe.calculations.fetch_add(1, Ordering::SeqCst);
            self.probe
                .precision_at_calculate
                .store(self.precision, Ordering::SeqCst);
            self.running = true;
            self.probe.started.store(true, Ordering::SeqCst);
        }

        fn busy(&self) -> bool {
            self.running
                && !self.probe.release.load(Ordering::SeqCst)
                && !self.probe.aborted.load(Ordering::SeqCst)
        }

        fn abort(&mut self) {
            self.probe.aborted.store(true, Ordering::SeqCst);
        }

        fn take_messages(&mut self) -> Vec<Message> {
            std::mem::take(&mut self.messages)
        }

        fn take_result(&mut self) -> Option<MathStructure> {
            self.result.take()
        }
    }

    #[test]
    fn test_simple_result_item() {
        let adapter = builtin(&Settings::default());
        let items = adapter.handle_global_query(&Query::new("2+2"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].score, 1.0);

        let item = &items[0].item;
        assert_eq!(item.id, "qalc-res");
        assert_eq!(item.text, "4");
        assert_eq!(item.subtext, "Result of 2+2");
        assert_eq!(item.icon, ICON);
        assert_eq!(item.actions[0].title, "Copy result to clipboard");
        assert_eq!(
            item.actions[1].kind,
            ActionKind::CopyToClipboard {
                text: "2+2 = 4".to_string()
            }
        );
    }

    #[test]
    fn test_division_by_zero() {
        let adapter = builtin(&Settings::default());
        assert!(adapter.handle_global_query(&Query::new("1/0")).is_empty());

        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "1/0"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "qalc-err");
        assert_eq!(items[0].text, "Evaluation error.");
        assert!(items[0].subtext.contains("Division by zero"));
        assert_eq!(items[0].actions.len(), 1);
        assert_eq!(items[0].actions[0].title, "Visit documentation");
        assert_eq!(
            items[0].actions[0].kind,
            ActionKind::OpenUrl {
                url: DOCUMENTATION_URL.to_string()
            }
        );
    }

    #[test]
    fn test_diagnostics_are_joined_in_order() {
        let (calculator, probe) = Scripted::new(Err(vec!["first".into(), "second".into()]));
        probe.release.store(true, Ordering::SeqCst);
        let adapter = QueryAdapter::new(calculator, &Settings::default())
            .with_poll_interval(Duration::from_millis(1));
        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "x"));
        assert_eq!(items[0].subtext, "first, second");
    }

    #[test]
    fn test_empty_input_never_reaches_engine() {
        let (calculator, probe) = Scripted::new(Ok(Number::one()));
        let adapter = QueryAdapter::new(calculator, &Settings::default());
        assert!(adapter.handle_global_query(&Query::new("")).is_empty());
        assert!(adapter.handle_global_query(&Query::new("   ")).is_empty());
        assert!(adapter.handle_trigger_query(&Query::with_trigger("=", " \t")).is_empty());
        assert_eq!(probe.calculations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalidated_query_produces_nothing() {
        let (calculator, probe) = Scripted::new(Ok(Number::one()));
        let adapter = QueryAdapter::new(calculator, &Settings::default())
            .with_poll_interval(Duration::from_millis(1));

        let query = Query::with_trigger("=", "1");
        query.invalidate();
        assert!(adapter.handle_trigger_query(&query).is_empty());
        assert!(probe.aborted.load(Ordering::SeqCst));

        let query = Query::new("1");
        query.invalidate();
        assert!(adapter.handle_global_query(&query).is_empty());
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let (calculator, probe) = Scripted::new(Ok(Number::one()));
        let adapter = QueryAdapter::new(calculator, &Settings::default())
            .with_poll_interval(Duration::from_millis(1));

        let query = Query::new("1");
        let handle = query.cancel_handle();
        let canceller = std::thread::spawn(move || {
            while !probe.started.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            handle.cancel();
        });

        assert!(adapter.handle_global_query(&query).is_empty());
        canceller.join().unwrap();
    }

    #[test]
    fn test_precision_change_waits_for_running_calculation() {
        let (calculator, probe) = Scripted::new(Ok(Number::from_ratio(2, 3)));
        let adapter = Arc::new(
            QueryAdapter::new(calculator, &Settings::default())
                .with_poll_interval(Duration::from_millis(1)),
        );

        let running = {
            let adapter = Arc::clone(&adapter);
            std::thread::spawn(move || adapter.handle_trigger_query(&Query::with_trigger("=", "2/3")))
        };
        while !probe.started.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }

        let setter = {
            let adapter = Arc::clone(&adapter);
            std::thread::spawn(move || adapter.set_precision(5))
        };
        std::thread::sleep(Duration::from_millis(5));
        probe.release.store(true, Ordering::SeqCst);

        let items = running.join().unwrap();
        setter.join().unwrap();
        assert_eq!(items[0].text, "0.6666666666666666…");

        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "2/3"));
        assert_eq!(items[0].text, "0.66666…");
        assert_eq!(adapter.precision(), 5);
    }

    #[test]
    fn test_global_query_respects_function_setting() {
        let adapter = builtin(&Settings::default());
        assert!(adapter.handle_global_query(&Query::new("sqrt(9)")).is_empty());
        assert_eq!(adapter.handle_trigger_query(&Query::with_trigger("=", "sqrt(9)"))[0].text, "3");

        adapter.set_functions_in_global_query(true);
        let items = adapter.handle_global_query(&Query::new("sqrt(9)"));
        assert_eq!(items[0].item.text, "3");
    }

    #[test]
    fn test_global_query_respects_unit_setting() {
        let adapter = builtin(&Settings::default());
        assert!(adapter.handle_global_query(&Query::new("10 km to m")).is_empty());
        adapter.set_units_in_global_query(true);
        let items = adapter.handle_global_query(&Query::new("10 km to m"));
        assert_eq!(items[0].item.text, "10000 m");
    }

    #[test]
    fn test_approximate_subtitle() {
        let adapter = builtin(&Settings::default());
        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "sqrt(2)"));
        assert_eq!(items[0].subtext, "Approximate result of sqrt(2)");
        assert_eq!(items[0].text, "1.414213562373095");

        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "1/3"));
        assert_eq!(items[0].subtext, "Result of 1/3");
        assert_eq!(items[0].text, "0.3333333333333333…");
    }

    #[test]
    fn test_settings_apply_to_engine() {
        let settings = Settings {
            angle_unit: AngleUnit::Degrees,
            parsing_mode: ParsingMode::Rpn,
            precision: 4,
            ..Settings::default()
        };
        let adapter = builtin(&settings);
        assert_eq!(adapter.settings(), settings);

        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "90 sin 2 +"));
        assert_eq!(items[0].text, "3");

        adapter.set_parsing_mode(ParsingMode::Conventional);
        adapter.set_angle_unit(AngleUnit::Radians);
        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "2/3"));
        assert_eq!(items[0].text, "0.6666…");
    }

    #[test]
    fn test_unicode_signs_in_output() {
        let adapter = builtin(&Settings::default());
        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "2 − 5"));
        assert_eq!(items[0].text, "−3");
    }

    #[test]
    fn test_deeply_nested_input_is_an_error_item() {
        let adapter = builtin(&Settings::default());
        let long_sum = format!("{}1", "1+".repeat(200_000));
        let items = adapter.handle_trigger_query(&Query::with_trigger("=", long_sum));
        assert_eq!(items[0].id, "qalc-err");
        assert_eq!(items[0].subtext, "Expression is too deeply nested.");
        assert!(adapter.handle_global_query(&Query::new(format!("{}1", "(".repeat(50_000)))).is_empty());
    }

    #[test]
    fn test_huge_exponent_settles_quickly() {
        let adapter = builtin(&Settings::default());
        let started = std::time::Instant::now();
        assert!(adapter.handle_global_query(&Query::new("1e999999")).is_empty());
        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "1e9999999999"));
        assert_eq!(items[0].subtext, "Result is not a finite number.");
        assert!(started.elapsed() < Duration::from_secs(5));

        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "(2^60000)^3"));
        assert_eq!(items[0].id, "qalc-err");
    }

    #[test]
    fn test_invalid_query_aborts_builtin_calculation() {
        let adapter = builtin(&Settings::default());
        let outcome = adapter.evaluate_text("10000!", true, || false);
        assert!(matches!(
            outcome,
            Outcome::Diagnostics(ref messages) if messages[..] == ["Calculation was aborted."]
        ));

        // the engine is usable again afterwards
        let items = adapter.handle_trigger_query(&Query::with_trigger("=", "10!"));
        assert_eq!(items[0].text, "3628800");
    }
}

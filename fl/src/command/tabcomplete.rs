//! Tab completion helpers

use std::collections::HashMap;

type Supplier = Box<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Picks a completion supplier by the position of the token being typed
///
/// Suppliers registered with [`at`](Self::at) apply to one position; the one
/// registered with [`from`](Self::from) applies to that position and every
/// later one, taking precedence.
#[derive(Default)]
pub struct ArgumentCompleter {
    at: HashMap<usize, Supplier>,
    from: Option<(usize, Supplier)>,
}

impl ArgumentCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: usize, supplier: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.at.insert(position, Box::new(supplier));
        self
    }

    pub fn from(mut self, position: usize, supplier: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.from = Some((position, Box::new(supplier)));
        self
    }

    /// Complete the last token of `args`; no tokens is an empty first token
    pub fn complete(&self, args: &[String]) -> Vec<String> {
        let position = args.len().saturating_sub(1);
        let partial = args.last().map(String::as_str).unwrap_or("");

        if let Some((from, supplier)) = &self.from
            && position >= *from
        {
            return supplier(partial);
        }
        self.at.get(&position).map(|supplier| supplier(partial)).unwrap_or_default()
    }
}

/// Supplier offering the `options` that start with the partial token
///
/// Matching is case-sensitive and keeps the order of `options`.
pub fn starts_with(options: Vec<String>) -> impl Fn(&str) -> Vec<String> + Send + Sync + 'static {
    move |partial| {
        options
            .iter()
            .filter(|option| option.starts_with(partial))
            .cloned()
            .collect()
    }
}

/// Suggest the `options` not already present in `args`, filtered by the last token
pub fn complete_flags<S: AsRef<str>>(args: &[String], options: &[S]) -> Vec<String> {
    let remaining: Vec<String> = options
        .iter()
        .map(|option| option.as_ref().to_string())
        .filter(|option| !args.contains(option))
        .collect();
    ArgumentCompleter::new().from(0, starts_with(remaining)).complete(args)
}

use serde_json::{Map, Value, json};

/// JSON-backed editor configuration addressed by dotted paths (e.g. `view.maxScale`).
///
/// [`SprigConfig::default`] carries the built-in defaults; site overrides are applied with
/// [`SprigConfig::deep_merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct SprigConfig(Value);

impl Default for SprigConfig {
    fn default() -> Self {
        Self(default_config_value())
    }
}

fn default_config_value() -> Value {
    json!({
        "layout": {
            "reservedWidth": 300.0,
            "minLevelSpacing": 80.0,
            "minSiblingSpacing": 24.0
        },
        "view": {
            "rootAnchorX": 1.0 / 6.0,
            "rootAnchorY": 0.5,
            "initialScale": 0.8,
            "minScale": 0.1,
            "maxScale": 4.0
        },
        "theme": {
            "linkStroke": "#4b5563",
            "linkStrokeWidth": 1.5,
            "nodeFill": "#10b981",
            "nodeStroke": "#34d399",
            "selectedFill": "#3b82f6",
            "selectedStroke": "#60a5fa",
            "nodeRadius": 6.0,
            "nodeStrokeWidth": 2.0,
            "fontSize": 14.0,
            "labelColor": "white",
            "labelHalo": "#111827"
        },
        "export": {
            "background": "#111827",
            "scale": 2.0
        }
    })
}

impl SprigConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Defaults with `overrides` merged on top.
    pub fn with_overrides(overrides: &Value) -> Self {
        let mut cfg = Self::default();
        cfg.deep_merge(overrides);
        cfg
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    fn get(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.get(dotted_path)?.as_str()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.get(dotted_path)?.as_bool()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        let v = self.get(dotted_path)?;
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
            .filter(|v| v.is_finite())
    }

    /// Reads a number, falling back to the built-in default and then to `fallback`.
    pub fn f64_or(&self, dotted_path: &str, fallback: f64) -> f64 {
        self.get_f64(dotted_path)
            .or_else(|| Self::default().get_f64(dotted_path))
            .unwrap_or(fallback)
    }

    /// Reads a string, falling back to the built-in default and then to `fallback`.
    pub fn str_or(&self, dotted_path: &str, fallback: &str) -> String {
        if let Some(v) = self.get_str(dotted_path) {
            return v.to_string();
        }
        Self::default()
            .get_str(dotted_path)
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        // Configs are objects; coerce anything else so this never panics on user input.
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_view_bounds() {
        let cfg = SprigConfig::default();
        assert_eq!(cfg.get_f64("view.minScale"), Some(0.1));
        assert_eq!(cfg.get_f64("view.maxScale"), Some(4.0));
        assert_eq!(cfg.get_str("theme.selectedFill"), Some("#3b82f6"));
    }

    #[test]
    fn deep_merge_keeps_sibling_defaults() {
        let cfg = SprigConfig::with_overrides(&json!({ "view": { "maxScale": 8 } }));
        assert_eq!(cfg.get_f64("view.maxScale"), Some(8.0));
        assert_eq!(cfg.get_f64("view.minScale"), Some(0.1));
    }

    #[test]
    fn fallbacks_use_builtin_defaults() {
        let cfg = SprigConfig::empty_object();
        assert_eq!(cfg.f64_or("layout.reservedWidth", 0.0), 300.0);
        assert_eq!(cfg.str_or("theme.nodeFill", "red"), "#10b981");
        assert_eq!(cfg.f64_or("nope.missing", 7.0), 7.0);
    }

    #[test]
    fn set_value_coerces_non_objects() {
        let mut cfg = SprigConfig::from_value(json!(42));
        cfg.set_value("export.scale", json!(3));
        assert_eq!(cfg.get_f64("export.scale"), Some(3.0));
    }
}

//! Typed material parameters with GPU uniform packing and RON presets.
//!
//! A [`ParameterGroup`] is an ordered list of named values. The order is
//! the uniform struct layout seen by the shader, packed with the usual GPU
//! alignment rules: scalars on 4 bytes, two-component vectors on 8, three-
//! and four-component vectors and matrices on 16, the whole struct padded
//! to 16. Three-component vectors occupy 16 bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::change::ChangeCounter;

/// Errors raised while saving or applying a parameter preset.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("failed to parse preset: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize preset: {0}")]
    Serialize(#[from] ron::Error),
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("parameter '{label}' expects {expected}, got {found}")]
    TypeMismatch {
        label: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// A typed parameter value. Serialized externally tagged, e.g. `Float3((1.0, 0.5, 0.0))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Float4x4([[f32; 4]; 4]),
    String(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Float2(_) => "float2",
            Self::Float3(_) => "float3",
            Self::Float4(_) => "float4",
            Self::Float4x4(_) => "float4x4",
            Self::String(_) => "string",
        }
    }

    /// Byte alignment inside a uniform struct. Strings are not uploaded.
    pub fn alignment(&self) -> usize {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::UInt(_) | Self::Float(_) => 4,
            Self::Float2(_) => 8,
            Self::Float3(_) | Self::Float4(_) | Self::Float4x4(_) => 16,
            Self::String(_) => 1,
        }
    }

    /// Byte size inside a uniform struct.
    pub fn size(&self) -> usize {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::UInt(_) | Self::Float(_) => 4,
            Self::Float2(_) => 8,
            Self::Float3(_) | Self::Float4(_) => 16,
            Self::Float4x4(_) => 64,
            Self::String(_) => 0,
        }
    }

    fn same_type(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Bool(v) => out.extend_from_slice(bytemuck::bytes_of(&(*v as u32))),
            Self::Int(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::UInt(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Float(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Float2(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            Self::Float3(v) => {
                out.extend_from_slice(bytemuck::cast_slice(v));
                out.extend_from_slice(&[0u8; 4]);
            }
            Self::Float4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            Self::Float4x4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            Self::String(_) => {}
        }
    }

    /// Clamp numeric scalars into `[min, max]` when both bounds share the type.
    fn clamped(self, min: Option<&ParameterValue>, max: Option<&ParameterValue>) -> Self {
        match (self, min, max) {
            (Self::Float(v), Some(Self::Float(lo)), Some(Self::Float(hi))) => {
                Self::Float(v.clamp(*lo, *hi))
            }
            (Self::Int(v), Some(Self::Int(lo)), Some(Self::Int(hi))) => Self::Int(v.clamp(*lo, *hi)),
            (Self::UInt(v), Some(Self::UInt(lo)), Some(Self::UInt(hi))) => {
                Self::UInt(v.clamp(*lo, *hi))
            }
            (value, _, _) => value,
        }
    }
}

/// Editing widget hint for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlType {
    #[default]
    None,
    Slider,
    MultiSlider,
    ColorPicker,
    Toggle,
    InputField,
    Label,
}

/// A named, typed value with a default and optional bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub label: String,
    pub value: ParameterValue,
    pub default_value: ParameterValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ParameterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ParameterValue>,
    #[serde(default)]
    pub control: ControlType,
}

impl Parameter {
    pub fn new(label: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            label: label.into(),
            default_value: value.clone(),
            value,
            min: None,
            max: None,
            control: ControlType::None,
        }
    }

    pub fn with_range(mut self, min: ParameterValue, max: ParameterValue) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self.control = ControlType::Slider;
        self
    }

    pub fn with_control(mut self, control: ControlType) -> Self {
        self.control = control;
        self
    }
}

/// On-disk preset: parameter label to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub label: String,
    pub values: BTreeMap<String, ParameterValue>,
}

/// Ordered parameter list backing a material's uniform struct.
#[derive(Debug, Clone)]
pub struct ParameterGroup {
    label: String,
    parameters: Vec<Parameter>,
    changes: ChangeCounter,
}

impl ParameterGroup {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parameters: Vec::new(),
            changes: ChangeCounter::new(),
        }
    }

    pub fn with(mut self, parameter: Parameter) -> Self {
        self.push(parameter);
        self
    }

    /// Append a parameter, replacing any existing one with the same label.
    pub fn push(&mut self, parameter: Parameter) {
        if let Some(existing) = self
            .parameters
            .iter_mut()
            .find(|p| p.label == parameter.label)
        {
            *existing = parameter;
        } else {
            self.parameters.push(parameter);
        }
        self.changes.bump();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&ParameterValue> {
        self.parameters
            .iter()
            .find(|p| p.label == label)
            .map(|p| &p.value)
    }

    /// Set a value. The type must match the parameter's declared type;
    /// numeric scalars are clamped into their range.
    pub fn set(&mut self, label: &str, value: ParameterValue) -> Result<(), PresetError> {
        let parameter = self
            .parameters
            .iter_mut()
            .find(|p| p.label == label)
            .ok_or_else(|| PresetError::UnknownParameter(label.to_string()))?;

        if !parameter.value.same_type(&value) {
            return Err(PresetError::TypeMismatch {
                label: label.to_string(),
                expected: parameter.value.type_name(),
                found: value.type_name(),
            });
        }

        let value = value.clamped(parameter.min.as_ref(), parameter.max.as_ref());
        if parameter.value != value {
            parameter.value = value;
            self.changes.bump();
        }
        Ok(())
    }

    /// Restore every parameter to its default value.
    pub fn reset(&mut self) {
        for parameter in &mut self.parameters {
            parameter.value = parameter.default_value.clone();
        }
        self.changes.bump();
    }

    pub fn changes(&self) -> &ChangeCounter {
        &self.changes
    }

    /// Pack the values into uniform struct bytes.
    pub fn uniform_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.uniform_size());
        for parameter in &self.parameters {
            let value = &parameter.value;
            if value.size() == 0 {
                continue;
            }
            let aligned = out.len().next_multiple_of(value.alignment());
            out.resize(aligned, 0);
            value.write_bytes(&mut out);
        }
        let padded = out.len().next_multiple_of(16);
        out.resize(padded, 0);
        out
    }

    /// Size of [`uniform_bytes`](Self::uniform_bytes) without building it.
    pub fn uniform_size(&self) -> usize {
        let size = self
            .parameters
            .iter()
            .map(|p| &p.value)
            .filter(|v| v.size() > 0)
            .fold(0usize, |offset, v| {
                offset.next_multiple_of(v.alignment()) + v.size()
            });
        size.next_multiple_of(16)
    }

    pub fn to_preset(&self) -> Preset {
        Preset {
            label: self.label.clone(),
            values: self
                .parameters
                .iter()
                .map(|p| (p.label.clone(), p.value.clone()))
                .collect(),
        }
    }

    /// Serialize the current values as a RON preset document.
    pub fn save_preset(&self) -> Result<String, PresetError> {
        let pretty = ron::ser::PrettyConfig::default();
        Ok(ron::ser::to_string_pretty(&self.to_preset(), pretty)?)
    }

    /// Apply a preset document. Entries naming unknown parameters or carrying
    /// the wrong type are skipped with a warning. Returns the number applied.
    pub fn load_preset(&mut self, document: &str) -> Result<usize, PresetError> {
        let preset: Preset = ron::from_str(document)?;
        Ok(self.apply_preset(&preset))
    }

    pub fn apply_preset(&mut self, preset: &Preset) -> usize {
        let mut applied = 0;
        for (label, value) in &preset.values {
            match self.set(label, value.clone()) {
                Ok(()) => applied += 1,
                Err(err) => log::warn!("ParameterGroup '{}': skipping preset entry: {}", self.label, err),
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> ParameterGroup {
        ParameterGroup::new("Standard")
            .with(Parameter::new("baseColor", ParameterValue::Float4([1.0, 1.0, 1.0, 1.0])))
            .with(
                Parameter::new("roughness", ParameterValue::Float(0.5))
                    .with_range(ParameterValue::Float(0.0), ParameterValue::Float(1.0)),
            )
            .with(Parameter::new("emissive", ParameterValue::Float3([0.0, 0.0, 0.0])))
            .with(Parameter::new("name", ParameterValue::String("unnamed".into())))
    }

    #[test]
    fn test_uniform_layout() {
        let g = group();
        // float4 @0, float @16, float3 @32 (16 bytes), padded to 48
        assert_eq!(g.uniform_size(), 48);
        let bytes = g.uniform_bytes();
        assert_eq!(bytes.len(), 48);
        let roughness: f32 = bytemuck::pod_read_unaligned(&bytes[16..20]);
        assert_eq!(roughness, 0.5);
    }

    #[test]
    fn test_set_clamps_and_bumps() {
        let mut g = group();
        let before = g.changes().revision();
        g.set("roughness", ParameterValue::Float(3.0)).unwrap();
        assert_eq!(g.get("roughness"), Some(&ParameterValue::Float(1.0)));
        assert!(g.changes().revision() > before);
    }

    #[test]
    fn test_set_same_value_does_not_bump() {
        let mut g = group();
        let before = g.changes().revision();
        g.set("roughness", ParameterValue::Float(0.5)).unwrap();
        assert_eq!(g.changes().revision(), before);
    }

    #[test]
    fn test_set_type_mismatch() {
        let mut g = group();
        let err = g.set("roughness", ParameterValue::Int(1)).unwrap_err();
        assert!(matches!(err, PresetError::TypeMismatch { .. }));
    }

    #[test]
    fn test_preset_round_trip() {
        let mut g = group();
        g.set("roughness", ParameterValue::Float(0.25)).unwrap();
        let doc = g.save_preset().unwrap();

        let mut other = group();
        let applied = other.load_preset(&doc).unwrap();
        assert_eq!(applied, 4);
        assert_eq!(other.get("roughness"), Some(&ParameterValue::Float(0.25)));
    }

    #[test]
    fn test_preset_skips_malformed_entries() {
        let mut g = group();
        let doc = r#"(
            label: "Standard",
            values: {
                "roughness": Float(0.75),
                "metallic": Float(1.0),
                "baseColor": Float(1.0),
            },
        )"#;
        let applied = g.load_preset(doc).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(g.get("roughness"), Some(&ParameterValue::Float(0.75)));
        assert_eq!(g.get("baseColor"), Some(&ParameterValue::Float4([1.0; 4])));
    }

    #[test]
    fn test_reset() {
        let mut g = group();
        g.set("roughness", ParameterValue::Float(0.1)).unwrap();
        g.reset();
        assert_eq!(g.get("roughness"), Some(&ParameterValue::Float(0.5)));
    }
}

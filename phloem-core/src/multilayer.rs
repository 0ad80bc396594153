use std::num::NonZeroUsize;

use thiserror::Error;

use crate::module::{ModuleDefinition, Operation};

/// Errors raised while composing a multilayer module.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultilayerError {
    #[error("output base name \"{base}\" is not declared as a multiclass or pure multilayer output")]
    UnclassifiedOutput { base: String },
}

/// The position of one evaluation within a layered canopy: the zero-based
/// layer index (layer 0 is the top of the canopy) and the total layer
/// count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerContext {
    pub layer: usize,
    pub nlayers: usize,
}

/// A single-layer canopy computation that can be replicated across layers
/// and leaf classes.
///
/// A layer model declares its inputs once, unexpanded: layer and class
/// context is passed to the evaluation methods instead of being encoded in
/// the input names. Its outputs are declared as base names in two
/// categories:
///
/// - *multiclass multilayer* outputs differ per leaf class and per layer
///   (e.g. the photon flux incident on sunlit versus shaded leaves);
/// - *pure multilayer* outputs differ per layer only (e.g. air properties
///   at the layer's height).
///
/// The composed module generates one quantity name per (class, layer) or
/// per layer from these base names; see [`MultilayerExpansion`].
pub trait LayerModel {
    /// Input quantity names of the underlying computation.
    fn input_names(&self) -> Vec<String>;

    /// Leaf class names, in evaluation order. An empty list means the model
    /// makes no class distinction, and multiclass outputs use the pure
    /// naming form.
    fn leaf_classes(&self) -> Vec<String>;

    /// Base names of outputs that vary by leaf class and layer.
    fn multiclass_multilayer_outputs(&self) -> Vec<String>;

    /// Base names of outputs that vary by layer only.
    fn pure_multilayer_outputs(&self) -> Vec<String>;

    /// Computes the multiclass outputs for one (layer, class) pair.
    ///
    /// `outputs` is positional over
    /// [`multiclass_multilayer_outputs`](LayerModel::multiclass_multilayer_outputs).
    fn run_class(&self, inputs: &[f64], context: LayerContext, class: usize, outputs: &mut [f64]);

    /// Computes the pure multilayer outputs for one layer.
    ///
    /// `outputs` is positional over
    /// [`pure_multilayer_outputs`](LayerModel::pure_multilayer_outputs).
    fn run_layer(&self, inputs: &[f64], context: LayerContext, outputs: &mut [f64]);

    /// Whether the replicated computation is smooth enough for adaptive
    /// step-size control.
    fn is_adaptive_compatible(&self) -> bool {
        true
    }
}

/// Builds the generated quantity name for one output cell.
///
/// Multiclass outputs are named `<class>_<base>_layer_<k>`; pure outputs
/// (or multiclass outputs of a model with no leaf classes, passed here as
/// an empty class) are named `<base>_layer_<k>`. Layer indices are
/// zero-based and unpadded. Downstream consumers rely on this exact form.
#[must_use]
pub fn layer_quantity(class: &str, base: &str, layer: usize) -> String {
    if class.is_empty() {
        format!("{base}_layer_{layer}")
    } else {
        format!("{class}_{base}_layer_{layer}")
    }
}

/// The generated name set for a layer model replicated across `nlayers`
/// layers.
///
/// For each multiclass base name the expansion holds exactly
/// `nlayers × |classes|` generated names, and for each pure base name
/// exactly `nlayers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultilayerExpansion {
    nlayers: usize,
    classes: Vec<String>,
    multiclass: Vec<String>,
    pure: Vec<String>,
}

impl MultilayerExpansion {
    /// Captures a model's declared classes and output bases for `nlayers`
    /// layers.
    #[must_use]
    pub fn for_model(model: &dyn LayerModel, nlayers: NonZeroUsize) -> Self {
        Self {
            nlayers: nlayers.get(),
            classes: model.leaf_classes(),
            multiclass: model.multiclass_multilayer_outputs(),
            pure: model.pure_multilayer_outputs(),
        }
    }

    #[must_use]
    pub fn nlayers(&self) -> usize {
        self.nlayers
    }

    /// Expands one base name into its generated quantity names.
    ///
    /// Multiclass bases expand class-major: all layers of the first declared
    /// class, then all layers of the next.
    ///
    /// # Errors
    ///
    /// Returns [`MultilayerError::UnclassifiedOutput`] if the base name is
    /// declared in neither output category.
    pub fn expand(&self, base: &str) -> Result<Vec<String>, MultilayerError> {
        if self.multiclass.iter().any(|b| b == base) {
            let mut names = Vec::with_capacity(self.effective_classes() * self.nlayers);
            if self.classes.is_empty() {
                names.extend((0..self.nlayers).map(|k| layer_quantity("", base, k)));
            } else {
                for class in &self.classes {
                    names.extend((0..self.nlayers).map(|k| layer_quantity(class, base, k)));
                }
            }
            Ok(names)
        } else if self.pure.iter().any(|b| b == base) {
            Ok((0..self.nlayers)
                .map(|k| layer_quantity("", base, k))
                .collect())
        } else {
            Err(MultilayerError::UnclassifiedOutput {
                base: base.to_string(),
            })
        }
    }

    /// All generated output names: multiclass bases first (in declared
    /// order, each expanded class-major), then pure bases.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for base in self.multiclass.iter().chain(&self.pure) {
            // Bases come straight from the declaration lists, so expansion
            // cannot fail here.
            if let Ok(expanded) = self.expand(base) {
                names.extend(expanded);
            }
        }
        names
    }

    fn effective_classes(&self) -> usize {
        self.classes.len().max(1)
    }
}

/// Composes a steady module that evaluates `model` once per layer (and per
/// leaf class for multiclass outputs), writing into the generated output
/// slots.
///
/// Layers are evaluated in increasing index order; within a layer, leaf
/// classes in declared order.
#[must_use]
pub fn multilayer_module(
    name: impl Into<String>,
    model: Box<dyn LayerModel>,
    nlayers: NonZeroUsize,
) -> ModuleDefinition {
    let all_bases: Vec<String> = model
        .multiclass_multilayer_outputs()
        .into_iter()
        .chain(model.pure_multilayer_outputs())
        .collect();
    let bases: Vec<&str> = all_bases.iter().map(String::as_str).collect();

    // Every base comes from the model's own declarations, so none can be
    // unclassified.
    match multilayer_module_with_outputs(name, model, nlayers, &bases) {
        Ok(definition) => definition,
        Err(MultilayerError::UnclassifiedOutput { .. }) => unreachable!(
            "bases taken from the model's declaration lists are always classified"
        ),
    }
}

/// Like [`multilayer_module`], but exposes only the requested output base
/// names.
///
/// # Errors
///
/// Returns [`MultilayerError::UnclassifiedOutput`] if a requested base is
/// declared in neither output category of the model.
pub fn multilayer_module_with_outputs(
    name: impl Into<String>,
    model: Box<dyn LayerModel>,
    nlayers: NonZeroUsize,
    bases: &[&str],
) -> Result<ModuleDefinition, MultilayerError> {
    let expansion = MultilayerExpansion::for_model(model.as_ref(), nlayers);

    let multiclass = model.multiclass_multilayer_outputs();
    let pure = model.pure_multilayer_outputs();

    let mut multiclass_keep = Vec::new();
    let mut pure_keep = Vec::new();
    for base in bases {
        if let Some(index) = multiclass.iter().position(|b| b == base) {
            multiclass_keep.push(index);
        } else if let Some(index) = pure.iter().position(|b| b == base) {
            pure_keep.push(index);
        } else {
            return Err(MultilayerError::UnclassifiedOutput {
                base: (*base).to_string(),
            });
        }
    }

    // Expand kept bases in declaration-list order so the output name list
    // matches the operation's slot layout.
    multiclass_keep.sort_unstable();
    pure_keep.sort_unstable();

    let mut outputs = Vec::new();
    for &index in &multiclass_keep {
        outputs.extend(expansion.expand(&multiclass[index])?);
    }
    for &index in &pure_keep {
        outputs.extend(expansion.expand(&pure[index])?);
    }

    let inputs = model.input_names();
    let adaptive_compatible = model.is_adaptive_compatible();

    let operation = MultilayerOperation {
        nlayers: nlayers.get(),
        nclasses: model.leaf_classes().len().max(1),
        n_multiclass: multiclass.len(),
        n_pure: pure.len(),
        multiclass_keep,
        pure_keep,
        model,
    };

    let definition =
        ModuleDefinition::steady(name, inputs, outputs, Box::new(operation));
    Ok(if adaptive_compatible {
        definition
    } else {
        definition.adaptive_incompatible()
    })
}

/// Evaluates the wrapped model for every layer and class, scattering each
/// value to its generated output slot.
struct MultilayerOperation {
    model: Box<dyn LayerModel>,
    nlayers: usize,
    nclasses: usize,
    n_multiclass: usize,
    n_pure: usize,
    multiclass_keep: Vec<usize>,
    pure_keep: Vec<usize>,
}

impl Operation for MultilayerOperation {
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) {
        let multiclass_len = self.multiclass_keep.len() * self.nclasses * self.nlayers;
        let (multiclass_out, pure_out) = outputs.split_at_mut(multiclass_len);

        let mut class_values = vec![0.0; self.n_multiclass];
        let mut layer_values = vec![0.0; self.n_pure];

        for layer in 0..self.nlayers {
            let context = LayerContext {
                layer,
                nlayers: self.nlayers,
            };
            if !self.multiclass_keep.is_empty() {
                for class in 0..self.nclasses {
                    self.model
                        .run_class(inputs, context, class, &mut class_values);
                    for (kept, &base) in self.multiclass_keep.iter().enumerate() {
                        let slot = (kept * self.nclasses + class) * self.nlayers + layer;
                        multiclass_out[slot] = class_values[base];
                    }
                }
            }
            if !self.pure_keep.is_empty() {
                self.model.run_layer(inputs, context, &mut layer_values);
                for (kept, &base) in self.pure_keep.iter().enumerate() {
                    pure_out[kept * self.nlayers + layer] = layer_values[base];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    use crate::store::QuantityStore;
    use crate::module::BoundModule;

    /// A toy canopy model: distributes incident light across layers, with
    /// sunlit leaves receiving twice the shaded dose, and reports each
    /// layer's depth.
    struct TestCanopy;

    impl LayerModel for TestCanopy {
        fn input_names(&self) -> Vec<String> {
            vec!["incident_light".to_string()]
        }

        fn leaf_classes(&self) -> Vec<String> {
            vec!["sunlit".to_string(), "shaded".to_string()]
        }

        fn multiclass_multilayer_outputs(&self) -> Vec<String> {
            vec!["light".to_string()]
        }

        fn pure_multilayer_outputs(&self) -> Vec<String> {
            vec!["depth".to_string()]
        }

        fn run_class(&self, inputs: &[f64], context: LayerContext, class: usize, outputs: &mut [f64]) {
            let share = inputs[0] / (context.layer + 1) as f64;
            outputs[0] = if class == 0 { share } else { share / 2.0 };
        }

        fn run_layer(&self, _inputs: &[f64], context: LayerContext, outputs: &mut [f64]) {
            outputs[0] = context.layer as f64;
        }
    }

    fn ten() -> NonZeroUsize {
        NonZeroUsize::new(10).unwrap()
    }

    #[test]
    fn expansion_generates_class_by_layer_names() {
        let expansion = MultilayerExpansion::for_model(&TestCanopy, ten());
        let names = expansion.expand("light").unwrap();

        assert_eq!(names.len(), 20);
        assert_eq!(names[0], "sunlit_light_layer_0");
        assert_eq!(names[9], "sunlit_light_layer_9");
        assert_eq!(names[10], "shaded_light_layer_0");
        assert_eq!(names[19], "shaded_light_layer_9");

        // All generated names are distinct.
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn expansion_generates_pure_layer_names() {
        let expansion = MultilayerExpansion::for_model(&TestCanopy, ten());
        let names = expansion.expand("depth").unwrap();

        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "depth_layer_0");
        assert_eq!(names[9], "depth_layer_9");
    }

    #[test]
    fn unclassified_base_is_an_error() {
        let expansion = MultilayerExpansion::for_model(&TestCanopy, ten());

        assert_eq!(
            expansion.expand("unheard_of"),
            Err(MultilayerError::UnclassifiedOutput {
                base: "unheard_of".to_string()
            })
        );
    }

    #[test]
    fn unclassified_base_fails_module_composition() {
        let result = multilayer_module_with_outputs(
            "canopy",
            Box::new(TestCanopy),
            ten(),
            &["light", "unheard_of"],
        );

        assert!(matches!(
            result.err(),
            Some(MultilayerError::UnclassifiedOutput { base }) if base == "unheard_of"
        ));
    }

    #[test]
    fn composed_module_writes_every_generated_slot() {
        let nlayers = NonZeroUsize::new(3).unwrap();
        let definition = multilayer_module("canopy", Box::new(TestCanopy), nlayers);

        assert_eq!(definition.input_names(), ["incident_light"]);
        assert_eq!(definition.output_names().len(), 2 * 3 + 3);

        let mut store = QuantityStore::new();
        store.insert("incident_light", 12.0).unwrap();
        for name in definition.output_names().to_vec() {
            store.insert(name, 0.0).unwrap();
        }

        let mut module = BoundModule::bind(definition, &store, &store).unwrap();
        module.evaluate(&mut store);

        // Sunlit leaves get the full per-layer share, shaded leaves half.
        assert_eq!(store.get("sunlit_light_layer_0"), Ok(12.0));
        assert_eq!(store.get("shaded_light_layer_0"), Ok(6.0));
        assert_eq!(store.get("sunlit_light_layer_2"), Ok(4.0));
        assert_eq!(store.get("shaded_light_layer_2"), Ok(2.0));

        assert_eq!(store.get("depth_layer_0"), Ok(0.0));
        assert_eq!(store.get("depth_layer_1"), Ok(1.0));
        assert_eq!(store.get("depth_layer_2"), Ok(2.0));
    }

    #[test]
    fn classless_model_uses_pure_naming_for_multiclass_outputs() {
        struct Classless;

        impl LayerModel for Classless {
            fn input_names(&self) -> Vec<String> {
                vec!["x".to_string()]
            }

            fn leaf_classes(&self) -> Vec<String> {
                Vec::new()
            }

            fn multiclass_multilayer_outputs(&self) -> Vec<String> {
                vec!["y".to_string()]
            }

            fn pure_multilayer_outputs(&self) -> Vec<String> {
                Vec::new()
            }

            fn run_class(
                &self,
                inputs: &[f64],
                context: LayerContext,
                _class: usize,
                outputs: &mut [f64],
            ) {
                outputs[0] = inputs[0] + context.layer as f64;
            }

            fn run_layer(&self, _inputs: &[f64], _context: LayerContext, _outputs: &mut [f64]) {}
        }

        let nlayers = NonZeroUsize::new(2).unwrap();
        let definition = multilayer_module("classless", Box::new(Classless), nlayers);

        assert_eq!(definition.output_names(), ["y_layer_0", "y_layer_1"]);

        let mut store = QuantityStore::new();
        store.insert("x", 10.0).unwrap();
        store.insert("y_layer_0", 0.0).unwrap();
        store.insert("y_layer_1", 0.0).unwrap();

        let mut module = BoundModule::bind(definition, &store, &store).unwrap();
        module.evaluate(&mut store);

        assert_eq!(store.get("y_layer_0"), Ok(10.0));
        assert_eq!(store.get("y_layer_1"), Ok(11.0));
    }
}

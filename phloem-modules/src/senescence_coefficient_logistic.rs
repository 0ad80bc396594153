use phloem_core::{ModuleDefinition, Operation};

/// The fraction of an organ's biomass senesced per time step, as a logistic
/// function of the development index `dvi`.
pub fn ksene(rate: f64, alpha: f64, beta: f64, dvi: f64) -> f64 {
    rate / (1.0 + (alpha + beta * dvi).exp())
}

/// Senescence coefficients for stem, leaf, root, and rhizome, each a
/// logistic curve over the plant's development index.
///
/// Each organ has a maximum senescence rate and its own `alpha`/`beta`
/// shape parameters; with a negative `beta`, senescence ramps up smoothly
/// as development progresses.
pub struct SenescenceCoefficientLogistic;

impl SenescenceCoefficientLogistic {
    pub fn input_names() -> Vec<String> {
        [
            "DVI", // dimensionless, development index
            "alphaSeneStem",
            "alphaSeneLeaf",
            "betaSeneStem",
            "betaSeneLeaf",
            "rateSeneLeaf", // maximum fraction of leaf senesced per time step
            "rateSeneStem", // maximum fraction of stem senesced per time step
            "alphaSeneRoot",
            "alphaSeneRhizome",
            "betaSeneRoot",
            "betaSeneRhizome",
            "rateSeneRoot",    // maximum fraction of root senesced per time step
            "rateSeneRhizome", // maximum fraction of rhizome senesced per time step
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    pub fn output_names() -> Vec<String> {
        ["kSeneStem", "kSeneLeaf", "kSeneRoot", "kSeneRhizome"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[must_use]
    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::steady(
            "senescence_coefficient_logistic",
            Self::input_names(),
            Self::output_names(),
            Box::new(Self),
        )
    }
}

impl Operation for SenescenceCoefficientLogistic {
    fn run(&self, inputs: &[f64], outputs: &mut [f64]) {
        let &[
            dvi,
            alpha_stem,
            alpha_leaf,
            beta_stem,
            beta_leaf,
            rate_leaf,
            rate_stem,
            alpha_root,
            alpha_rhizome,
            beta_root,
            beta_rhizome,
            rate_root,
            rate_rhizome,
        ] = inputs
        else {
            unreachable!("inputs follow the declared list");
        };

        outputs[0] = ksene(rate_stem, alpha_stem, beta_stem, dvi);
        outputs[1] = ksene(rate_leaf, alpha_leaf, beta_leaf, dvi);
        outputs[2] = ksene(rate_root, alpha_root, beta_root, dvi);
        outputs[3] = ksene(rate_rhizome, alpha_rhizome, beta_rhizome, dvi);
    }
}

use std::num::NonZeroUsize;

use phloem_core::{LayerContext, LayerModel, ModuleDefinition, multilayer_module};

/// Light reaching one canopy layer, split by leaf class.
#[derive(Debug, Clone, Copy)]
struct LayerLight {
    sunlit_par: f64,
    shaded_par: f64,
    sunlit_fraction: f64,
    scattered_par: f64,
}

/// Beam extinction coefficient for an ellipsoidal leaf angle distribution
/// (Campbell & Norman eq. 15.4), with `chil` the ratio of horizontal to
/// vertical leaf-area projection.
fn direct_extinction(cosine_zenith_angle: f64, chil: f64) -> f64 {
    let cos2 = cosine_zenith_angle * cosine_zenith_angle;
    let tan2 = (1.0 - cos2) / cos2;
    (chil * chil + tan2).sqrt() / (chil + 1.744 * (chil + 1.183).powf(-0.733))
}

fn layer_light(
    par_direct: f64,
    par_diffuse: f64,
    cosine_zenith_angle: f64,
    kd: f64,
    chil: f64,
    cumulative_lai: f64,
) -> LayerLight {
    let diffuse_par = par_diffuse * (-kd * cumulative_lai).exp();

    if cosine_zenith_angle <= 0.0 {
        // Below the horizon only diffuse light penetrates the canopy.
        return LayerLight {
            sunlit_par: diffuse_par,
            shaded_par: diffuse_par,
            sunlit_fraction: 0.0,
            scattered_par: 0.0,
        };
    }

    let k = direct_extinction(cosine_zenith_angle, chil);
    let sunlit_fraction = (-k * cumulative_lai).exp();

    // Beam light scattered out of the direct path accumulates on shaded
    // leaves; the difference of the two extinction profiles cannot drop
    // below zero.
    let scattered_par = (par_direct * (-kd * cumulative_lai).exp()
        - par_direct * (-k * cumulative_lai).exp())
    .max(0.0);

    let shaded_par = diffuse_par + scattered_par;

    LayerLight {
        sunlit_par: k * par_direct + shaded_par,
        shaded_par,
        sunlit_fraction,
        scattered_par,
    }
}

/// Environmental properties for sunlit and shaded leaves in each layer of a
/// multilayer canopy.
///
/// The canopy is divided into `nlayers` horizontal layers of equal leaf
/// area, indexed from the top. Some properties differ between sunlit and
/// shaded leaves within a layer (incident photon flux, leaf fraction) and
/// are declared as multiclass outputs; others vary with depth only (layer
/// height, humidity, windspeed, scattered and average light) and are
/// declared as pure multilayer outputs. A downstream canopy photosynthesis
/// module can expand the base names to route each generated quantity to a
/// leaf-level model.
pub struct CanopyProperties;

impl CanopyProperties {
    #[must_use]
    pub fn definition(nlayers: NonZeroUsize) -> ModuleDefinition {
        multilayer_module("canopy_properties", Box::new(Self), nlayers)
    }
}

/// The ten-layer canopy properties module, ready for registry use.
#[must_use]
pub fn ten_layer_canopy_properties() -> ModuleDefinition {
    const NLAYERS: NonZeroUsize = NonZeroUsize::new(10).unwrap();
    multilayer_module("ten_layer_canopy_properties", Box::new(CanopyProperties), NLAYERS)
}

impl LayerModel for CanopyProperties {
    fn input_names(&self) -> Vec<String> {
        vec![
            "par_incident_direct".to_string(),  // micromol / m^2 / s
            "par_incident_diffuse".to_string(), // micromol / m^2 / s
            "lai".to_string(),                  // dimensionless
            "cosine_zenith_angle".to_string(),  // dimensionless
            "kd".to_string(),                   // dimensionless, diffuse extinction
            "chil".to_string(),                 // dimensionless, leaf angle distribution
            "heightf".to_string(),              // m^-1, leaf area density
            "rh".to_string(),                   // dimensionless
            "windspeed".to_string(),            // m / s
        ]
    }

    fn leaf_classes(&self) -> Vec<String> {
        vec!["sunlit".to_string(), "shaded".to_string()]
    }

    fn multiclass_multilayer_outputs(&self) -> Vec<String> {
        vec!["incident_par".to_string(), "fraction".to_string()]
    }

    fn pure_multilayer_outputs(&self) -> Vec<String> {
        vec![
            "incident_scattered_par".to_string(),
            "incident_average_par".to_string(),
            "height".to_string(),
            "rh".to_string(),
            "windspeed".to_string(),
        ]
    }

    fn run_class(&self, inputs: &[f64], context: LayerContext, class: usize, outputs: &mut [f64]) {
        let &[par_direct, par_diffuse, lai, cosine_zenith_angle, kd, chil, ..] = inputs else {
            unreachable!("inputs follow the declared list");
        };

        let cumulative_lai = lai * (context.layer as f64 + 0.5) / context.nlayers as f64;
        let light = layer_light(par_direct, par_diffuse, cosine_zenith_angle, kd, chil, cumulative_lai);

        if class == 0 {
            outputs[0] = light.sunlit_par;
            outputs[1] = light.sunlit_fraction;
        } else {
            outputs[0] = light.shaded_par;
            outputs[1] = 1.0 - light.sunlit_fraction;
        }
    }

    fn run_layer(&self, inputs: &[f64], context: LayerContext, outputs: &mut [f64]) {
        let &[par_direct, par_diffuse, lai, cosine_zenith_angle, kd, chil, heightf, rh, windspeed] =
            inputs
        else {
            unreachable!("inputs follow the declared list");
        };

        let nlayers = context.nlayers as f64;
        let depth = context.layer as f64 + 0.5;
        let cumulative_lai = lai * depth / nlayers;

        let light = layer_light(par_direct, par_diffuse, cosine_zenith_angle, kd, chil, cumulative_lai);

        outputs[0] = light.scattered_par;
        outputs[1] = light.sunlit_fraction * light.sunlit_par
            + (1.0 - light.sunlit_fraction) * light.shaded_par;

        // Layer height above the ground, measured at the layer midpoint.
        outputs[2] = lai * (nlayers - depth) / nlayers / heightf;

        // Humidity rises toward saturation with depth into the canopy.
        outputs[3] = (rh * ((1.0 - rh) * (context.layer as f64 + 1.0) / nlayers).exp()).min(1.0);

        // Wind is attenuated by the leaf area above the layer.
        outputs[4] = windspeed * (-0.7 * cumulative_lai).exp();
    }
}

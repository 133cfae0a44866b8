use ad_moderation::config::AppConfig;
use ad_moderation::error::AppError;
use ad_moderation::moderation::images::{
    label_for, preprocess, GateError, OnnxVehicleClassifier, VehicleClassifier,
};
use ad_moderation::moderation::{
    AdFields, ConfiguredBackend, ImageClass, PolicyReviewer, ReviewDecision,
};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Image files to classify, in submission order
    #[arg(required = true)]
    pub(crate) images: Vec<PathBuf>,
    /// Model artifact to load instead of the configured MODEL_PATH
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReviewArgs {
    #[arg(long, default_value = "")]
    pub(crate) brand: String,
    #[arg(long, default_value = "")]
    pub(crate) model: String,
    #[arg(long, default_value = "")]
    pub(crate) variant: String,
    #[arg(long, default_value = "")]
    pub(crate) year: String,
    #[arg(long, default_value = "")]
    pub(crate) mileage: String,
    #[arg(long, default_value = "")]
    pub(crate) fuel_type: String,
    /// Engine displacement in cc
    #[arg(long, default_value = "")]
    pub(crate) engine_type: String,
    #[arg(long, default_value = "")]
    pub(crate) transmission: String,
    #[arg(long, default_value = "")]
    pub(crate) condition: String,
    #[arg(long)]
    pub(crate) description: String,
}

impl ReviewArgs {
    pub(crate) fn into_fields(self) -> AdFields {
        AdFields {
            brand: self.brand,
            model: self.model,
            variant: self.variant,
            year: self.year,
            mileage: self.mileage,
            fuel_type: self.fuel_type,
            engine_type: self.engine_type,
            transmission: self.transmission,
            condition: self.condition,
            description: self.description,
            ..AdFields::default()
        }
    }
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let model_path = match args.model {
        Some(path) => path,
        None => AppConfig::load()?.classifier.model_path,
    };

    let classifier = OnnxVehicleClassifier::load(&model_path)?;
    println!("Model: {}", model_path.display());

    let mut first_rejected = None;
    for (index, path) in args.images.iter().enumerate() {
        let bytes = std::fs::read(path)?;
        let tensor = preprocess(&bytes).map_err(|source| GateError::Decode { index, source })?;
        let scores = classifier
            .scores(&tensor)
            .map_err(|source| GateError::Inference { index, source })?;
        let class = label_for(&scores)
            .map_err(|source| GateError::Inference { index, source })?;

        println!("- {}: {} {:?}", path.display(), class.label(), scores);
        if class == ImageClass::NonVehicle && first_rejected.is_none() {
            first_rejected = Some(path);
        }
    }

    match first_rejected {
        Some(path) => println!(
            "Gate: reject (first non-vehicle image: {})",
            path.display()
        ),
        None => println!("Gate: pass"),
    }
    Ok(())
}

pub(crate) async fn run_review(args: ReviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let backend = ConfiguredBackend::from_config(&config.review)?;
    let reviewer = PolicyReviewer::new(backend, config.review.timeout);

    let verdict = reviewer.review(&args.into_fields()).await?;
    let decision = match verdict.decision {
        ReviewDecision::Approve => "Approve",
        ReviewDecision::Reject => "Reject",
    };
    println!("Decision: {decision}");
    println!("Reason: {}", verdict.reason);
    Ok(())
}

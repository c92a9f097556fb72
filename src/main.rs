//! Fine-tune the classifier on the preprocessed dataset under stratified
//! k-fold cross-validation, then evaluate on the held-out partition.

use std::process;

use afinar::class_weight::balanced_class_weights;
use afinar::model::{build_model, BackboneConfig};
use afinar::optim::Adam;
use afinar::rng::RngContext;
use afinar::train::{CallbackSet, Checkpointer, FitConfig, KFoldRunner, Trainer};
use afinar::{Dataset, Result};

const IMAGE_NUMBER: usize = 2000;
const IMAGE_SIZE: usize = 224;
const EPOCHS: usize = 30;
const BATCH_SIZE: usize = 32;
const N_SPLITS: usize = 5;
const SEED: u64 = 42;
const L2_REG: f32 = 0.001;
const LEARNING_RATE: f32 = 1e-4;
const BACKBONE_WEIGHTS: &str = "models/backbone.json";

fn run() -> Result<()> {
    let ctx = RngContext::new(SEED);

    println!("Loading data...");
    let data = Dataset::load(Dataset::data_dir(IMAGE_NUMBER, IMAGE_SIZE))?;
    println!("{}", data.describe());

    // One weight map for the whole run, derived from the full training
    // partition before any fold is carved out of it.
    let class_weights = balanced_class_weights(data.y_train.view())?;
    print!("Class weights:");
    for (class, weight) in class_weights.iter() {
        print!(" {class}: {weight:.6}");
    }
    println!();

    println!("Building model...");
    let config = BackboneConfig::default().with_weights(BACKBONE_WEIGHTS);
    let model = build_model(data.input_shape(), L2_REG, &config, &ctx)?;

    let checkpoint_path = Checkpointer::model_path(IMAGE_NUMBER, IMAGE_SIZE, EPOCHS);
    let mut trainer = Trainer::new(
        model,
        Box::new(Adam::default_params(LEARNING_RATE)),
        CallbackSet::new(checkpoint_path, EPOCHS),
        FitConfig {
            epochs: EPOCHS,
            batch_size: BATCH_SIZE,
            apply_class_weights: true,
        },
        ctx.batch_stream(),
    );

    let runner = KFoldRunner::new(N_SPLITS);
    runner.run(
        &mut trainer,
        data.x_train.view(),
        data.y_train.view(),
        &class_weights,
        &mut ctx.fold_stream(),
    )?;

    println!("Evaluating Model...");
    let report = trainer.evaluate(data.x_val.view(), data.y_val.view());
    println!("Evaluation Results:");
    println!("{report}");

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

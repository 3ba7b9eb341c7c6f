use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
    LearningRate,
};
use std::marker::PhantomData;

/// A module together with the optimizer that owns its update state.
///
/// Each `step` consumes one gradient container and keeps only the gradients of
/// the owned module, so nothing accumulates across backward passes.
pub struct TrainState<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    module: M,
    optimizer: O,
    _backend: PhantomData<B>,
}

impl<B, M, O> TrainState<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    pub fn new(module: M, optimizer: O) -> Self {
        Self {
            module,
            optimizer,
            _backend: PhantomData,
        }
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn into_module(self) -> M {
        self.module
    }

    /// Applies one optimizer update from the gradients of a backward pass.
    pub fn step(&mut self, lr: LearningRate, grads: B::Gradients) {
        let grads = GradientsParams::from_grads(grads, &self.module);
        self.module = self.optimizer.step(lr, self.module.clone(), grads);
    }
}

/// Decays the learning rate by `gamma` every `step_size` iterations.
#[derive(Debug, Clone)]
pub struct StepLr {
    initial_lr: LearningRate,
    step_size: usize,
    gamma: f64,
    iteration: usize,
}

impl StepLr {
    pub fn new(initial_lr: LearningRate, step_size: usize, gamma: f64) -> Self {
        Self {
            initial_lr,
            // a zero interval would divide by zero; treat it as "never decay"
            step_size: step_size.max(1),
            gamma: if step_size == 0 { 1.0 } else { gamma },
            iteration: 0,
        }
    }

    /// Rate for the current iteration.
    pub fn lr(&self) -> LearningRate {
        let decays = (self.iteration / self.step_size) as i32;
        self.initial_lr * self.gamma.powi(decays)
    }

    /// Moves to the next iteration and returns its rate.
    pub fn step(&mut self) -> LearningRate {
        self.iteration += 1;
        self.lr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestAutodiffBackend;
    use burn::{
        nn::{Linear, LinearConfig},
        optim::AdamConfig,
        prelude::*,
    };

    #[test]
    fn test_step_lr_decays_at_interval() {
        let mut schedule = StepLr::new(0.5, 2, 0.1);

        assert_eq!(schedule.lr(), 0.5);
        assert_eq!(schedule.step(), 0.5);
        assert!((schedule.step() - 0.05).abs() < 1e-12);
        assert!((schedule.step() - 0.05).abs() < 1e-12);
        assert!((schedule.step() - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_step_lr_zero_interval_never_decays() {
        let mut schedule = StepLr::new(0.1, 0, 0.1);

        for _ in 0..5 {
            assert_eq!(schedule.step(), 0.1);
        }
    }

    #[test]
    fn test_train_state_step_updates_owned_module() {
        let device = Default::default();
        let linear: Linear<TestAutodiffBackend> = LinearConfig::new(2, 1).init(&device);
        let before = linear.weight.val().inner();

        let mut state = TrainState::new(linear, AdamConfig::new().init());

        let input = Tensor::<TestAutodiffBackend, 2>::ones([4, 2], &device);
        let loss = state.module().forward(input).powf_scalar(2.0).mean();
        state.step(0.1, loss.backward());

        let after = state.into_module().weight.val().inner();
        let change: f32 = (after - before).abs().sum().into_scalar();
        assert!(change > 0.0);
    }
}

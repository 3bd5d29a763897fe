use nalgebra::Point3;

use crate::connection::commands::{
    CameraModeSetFixed, CameraModeSetFollow, CameraModeSetNormal, CameraSetPos,
};
use crate::connection::{EntityId, Protocol};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Fixed,
    Follow(Option<EntityId>),
    Normal(Option<EntityId>),
}

#[derive(Debug)]
pub struct Camera<'a, P: Protocol> {
    connection: &'a mut P,
}

impl<'a, P: Protocol> Camera<'a, P> {
    pub fn new(connection: &'a mut P) -> Self {
        Self { connection }
    }

    pub async fn set_mode(&mut self, mode: CameraMode) -> Result {
        match mode {
            CameraMode::Fixed => self.set_fixed().await,
            CameraMode::Follow(target) => self.set_follow(target).await,
            CameraMode::Normal(target) => self.set_normal(target).await,
        }
    }

    /// Stops the camera where it is; move it with [`Camera::set_position`].
    pub async fn set_fixed(&mut self) -> Result {
        self.connection.send_command(&CameraModeSetFixed {}).await?;
        Ok(())
    }

    /// Follows `target` from above, or the host player if there is no target.
    pub async fn set_follow(&mut self, target: Option<EntityId>) -> Result {
        self.connection
            .send_command(&CameraModeSetFollow { target })
            .await?;
        Ok(())
    }

    pub async fn set_normal(&mut self, target: Option<EntityId>) -> Result {
        self.connection
            .send_command(&CameraModeSetNormal { target })
            .await?;
        Ok(())
    }

    pub async fn set_position(&mut self, position: Point3<f64>) -> Result {
        self.connection
            .send_command(&CameraSetPos { coords: position })
            .await?;
        Ok(())
    }
}

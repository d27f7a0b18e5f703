/// A wrapper that is invisible to bincode serialization.
/// Encodes as zero bytes; decodes as `T::default()`. Used for host-side
/// data (ROM image, palette tables, peripherals) that must survive struct
/// derivation but not save-state files.
#[derive(Clone, Default)]
pub struct Transient<T>(pub T);

impl<T> bincode::Encode for Transient<T> {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        _encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        Ok(()) // write nothing
    }
}

impl<Context, T: Default> bincode::Decode<Context> for Transient<T> {
    fn decode<D: bincode::de::Decoder<Context = Context>>(
        _decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self(T::default()))
    }
}

impl<'de, Context, T: Default> bincode::BorrowDecode<'de, Context> for Transient<T> {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = Context>>(
        _decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self(T::default()))
    }
}

impl<T> core::ops::Deref for Transient<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::DerefMut for Transient<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Transient<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

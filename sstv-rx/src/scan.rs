/// Sample-by-sample processor.
///
/// Everything that runs in the receive chain implements this, so that stages
/// can be composed with [`ScannerExt::chain`] and [`ScannerExt::map`].
pub trait Scanner<S> {
    type Output;

    fn scan(&mut self, sample: S) -> Self::Output;
}

impl<S> Scanner<S> for () {
    type Output = S;

    #[inline]
    fn scan(&mut self, sample: S) -> Self::Output {
        sample
    }
}

pub trait ScannerExt<S>: Scanner<S> {
    #[inline]
    fn chain<T>(self, other: T) -> Chain<Self, T>
    where
        T: Scanner<Self::Output>,
        Self: Sized,
    {
        Chain {
            head: self,
            tail: other,
        }
    }

    #[inline]
    fn map<F, Q>(self, f: F) -> Chain<Self, FuncScanner<F>>
    where
        F: FnMut(Self::Output) -> Q,
        Self: Sized,
    {
        self.chain(FuncScanner::new(f))
    }

    /// Runs every sample of `samples` through the scanner and collects the
    /// outputs.
    #[inline]
    fn scan_all<I>(&mut self, samples: I) -> Vec<Self::Output>
    where
        I: IntoIterator<Item = S>,
        Self: Sized,
    {
        samples.into_iter().map(|sample| self.scan(sample)).collect()
    }
}

impl<S, T> ScannerExt<S> for T where T: Scanner<S> {}

#[derive(Clone, Debug)]
pub struct Chain<H, T> {
    head: H,
    tail: T,
}

impl<H, T> Chain<H, T> {
    #[inline]
    pub fn head(&self) -> &H {
        &self.head
    }

    #[inline]
    pub fn head_mut(&mut self) -> &mut H {
        &mut self.head
    }

    #[inline]
    pub fn tail(&self) -> &T {
        &self.tail
    }

    #[inline]
    pub fn tail_mut(&mut self) -> &mut T {
        &mut self.tail
    }
}

impl<H, T, S> Scanner<S> for Chain<H, T>
where
    H: Scanner<S>,
    T: Scanner<H::Output>,
{
    type Output = T::Output;

    #[inline]
    fn scan(&mut self, sample: S) -> Self::Output {
        self.tail.scan(self.head.scan(sample))
    }
}

#[derive(Clone, Debug)]
pub struct FuncScanner<F> {
    f: F,
}

impl<F> FuncScanner<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<S, Q, F> Scanner<S> for FuncScanner<F>
where
    F: FnMut(S) -> Q,
{
    type Output = Q;

    #[inline]
    fn scan(&mut self, sample: S) -> Self::Output {
        (self.f)(sample)
    }
}
